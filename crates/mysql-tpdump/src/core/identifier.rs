//! MySQL identifier quoting.

/// Quote a MySQL identifier with backticks.
///
/// Embedded backticks are doubled, matching the server's own quoting
/// rules for `sql_mode` without `ANSI_QUOTES`.
pub fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
