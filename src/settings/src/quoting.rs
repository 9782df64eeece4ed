// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Quoting for statements that cannot carry bound parameters.
//!
//! `ALTER SYSTEM` rejects placeholders, so the parameter name and value are
//! attached to the statement text via these primitives instead of string
//! formatting of the raw input.

/// Quotes `name` for use as a SQL identifier.
///
/// Always quotes, so the result is safe regardless of what `name` contains;
/// embedded double quotes are doubled per the SQL lexical rules.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes `value` for use as a SQL string literal.
///
/// Embedded single quotes are doubled. Backslashes need no treatment: this
/// library only ever speaks to servers with `standard_conforming_strings`
/// semantics, where a backslash in a plain literal is an ordinary character.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ident_plain() {
        assert_eq!(quote_ident("work_mem"), r#""work_mem""#);
    }

    #[test]
    fn ident_embedded_quotes() {
        assert_eq!(quote_ident(r#"wo"rk"#), r#""wo""rk""#);
        assert_eq!(
            quote_ident(r#"x"; DROP TABLE t; --"#),
            r#""x""; DROP TABLE t; --""#
        );
    }

    #[test]
    fn literal_plain() {
        assert_eq!(quote_literal("8MB"), "'8MB'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn literal_embedded_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(
            quote_literal("'; DROP TABLE t; --"),
            "'''; DROP TABLE t; --'"
        );
    }

    #[test]
    fn literal_backslashes_untouched() {
        assert_eq!(quote_literal(r"C:\data"), r"'C:\data'");
    }
}
