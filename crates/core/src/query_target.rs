//! Works out which single table a query reads from, so result rows can be
//! mapped back to that table for edits and deletes.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTarget {
    pub schema: Option<String>,
    pub table: String,
}

impl QueryTarget {
    /// `schema.table`, or just `table` when no schema was written.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.table),
            None => self.table.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Word(String),
    QuotedIdentifier(String),
    Literal,
    Dot,
    Comma,
    OpenParen,
    CloseParen,
    Semicolon,
    Symbol,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Self::Word(word) if word.eq_ignore_ascii_case(keyword))
    }

    fn identifier(&self) -> Option<&str> {
        match self {
            Self::Word(word) | Self::QuotedIdentifier(word) => Some(word.as_str()),
            _ => None,
        }
    }
}

fn read_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, close: char) -> String {
    let mut value = String::new();
    while let Some(ch) = chars.next() {
        if ch == close {
            if chars.peek() == Some(&close) {
                chars.next();
                value.push(ch);
                continue;
            }
            break;
        }
        value.push(ch);
    }
    value
}

fn tokenize(sql: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            _ if ch.is_whitespace() => {}
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '#' => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for next in chars.by_ref() {
                    if previous == '*' && next == '/' {
                        break;
                    }
                    previous = next;
                }
            }
            '\'' => {
                read_quoted(&mut chars, '\'');
                tokens.push(Token::Literal);
            }
            '"' => tokens.push(Token::QuotedIdentifier(read_quoted(&mut chars, '"'))),
            '`' => tokens.push(Token::QuotedIdentifier(read_quoted(&mut chars, '`'))),
            '[' => tokens.push(Token::QuotedIdentifier(read_quoted(&mut chars, ']'))),
            '.' => tokens.push(Token::Dot),
            ',' => tokens.push(Token::Comma),
            '(' => tokens.push(Token::OpenParen),
            ')' => tokens.push(Token::CloseParen),
            ';' => tokens.push(Token::Semicolon),
            _ if ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '@' => {
                let mut word = String::from(ch);
                while let Some(&next) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' || next == '$' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            _ => tokens.push(Token::Symbol),
        }
    }

    tokens
}

const CLAUSE_KEYWORDS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "FETCH", "UNION", "EXCEPT",
    "INTERSECT", "WINDOW", "FOR",
];

/// First `FROM` outside any parentheses, so subqueries and calls such as
/// `EXTRACT(YEAR FROM col)` are skipped.
fn from_position(tokens: &[Token]) -> Option<usize> {
    let mut depth = 0_usize;
    for (index, token) in tokens.iter().enumerate() {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            _ if depth == 0 && token.is_keyword("FROM") => return Some(index),
            _ => {}
        }
    }
    None
}

/// The table named right after the outermost `FROM`, with an optional schema
/// prefix. Quoting is stripped. `None` for derived tables or queries without a
/// `FROM`.
#[must_use]
pub fn resolve_target(sql: &str) -> Option<QueryTarget> {
    let tokens = tokenize(sql);
    let start = from_position(&tokens)? + 1;
    let first = tokens.get(start)?.identifier()?.to_string();

    if tokens.get(start + 1) == Some(&Token::Dot) {
        let table = tokens.get(start + 2)?.identifier()?.to_string();
        return Some(QueryTarget {
            schema: Some(first),
            table,
        });
    }

    Some(QueryTarget {
        schema: None,
        table: first,
    })
}

/// True when rows may come from more than one table: any `JOIN`, or a
/// comma-separated table list in the `FROM` clause.
#[must_use]
pub fn has_join(sql: &str) -> bool {
    let tokens = tokenize(sql);
    if tokens.iter().any(|token| token.is_keyword("JOIN")) {
        return true;
    }

    let Some(from) = from_position(&tokens) else {
        return false;
    };

    let mut depth = 0_usize;
    for token in &tokens[from + 1..] {
        match token {
            Token::OpenParen => depth += 1,
            Token::CloseParen => depth = depth.saturating_sub(1),
            Token::Semicolon if depth == 0 => return false,
            Token::Comma if depth == 0 => return true,
            Token::Word(word)
                if depth == 0
                    && CLAUSE_KEYWORDS
                        .iter()
                        .any(|keyword| word.eq_ignore_ascii_case(keyword)) =>
            {
                return false;
            }
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::{has_join, resolve_target, QueryTarget};

    fn target(schema: Option<&str>, table: &str) -> Option<QueryTarget> {
        Some(QueryTarget {
            schema: schema.map(ToString::to_string),
            table: table.to_string(),
        })
    }

    #[test]
    fn resolves_plain_and_schema_qualified_tables() {
        assert_eq!(resolve_target("SELECT * FROM users"), target(None, "users"));
        assert_eq!(
            resolve_target("select id from sales.orders where id = 1"),
            target(Some("sales"), "orders")
        );
        assert_eq!(
            resolve_target("SELECT * FROM sales.orders")
                .map(|target| target.qualified_name())
                .as_deref(),
            Some("sales.orders")
        );
    }

    #[test]
    fn strips_identifier_quoting() {
        assert_eq!(
            resolve_target("SELECT * FROM [dbo].[Order Details]"),
            target(Some("dbo"), "Order Details")
        );
        assert_eq!(
            resolve_target("SELECT * FROM \"public\".\"users\""),
            target(Some("public"), "users")
        );
        assert_eq!(
            resolve_target("SELECT * FROM `app`.`users`"),
            target(Some("app"), "users")
        );
    }

    #[test]
    fn ignores_from_inside_comments_and_literals() {
        assert_eq!(
            resolve_target("SELECT 'from nowhere' AS note /* FROM ghosts */ FROM users"),
            target(None, "users")
        );
        assert_eq!(
            resolve_target("-- FROM ghosts\nSELECT * FROM users"),
            target(None, "users")
        );
    }

    #[test]
    fn no_target_for_subqueries_or_missing_from() {
        assert_eq!(resolve_target("SELECT 1"), None);
        assert_eq!(resolve_target("SELECT * FROM (SELECT 1) AS t"), None);
        assert_eq!(resolve_target("SELECT EXTRACT(YEAR FROM NOW())"), None);
    }

    #[test]
    fn parenthesized_from_does_not_become_the_target() {
        let scalar_subquery =
            "SELECT (SELECT COUNT(*) FROM orders o WHERE o.user_id = u.id) AS n, u.id, u.name FROM users u";
        assert_eq!(resolve_target(scalar_subquery), target(None, "users"));
        assert!(!has_join(scalar_subquery));

        assert_eq!(
            resolve_target("SELECT id, EXTRACT(YEAR FROM created_at) AS y FROM orders"),
            target(None, "orders")
        );
        assert!(has_join(
            "SELECT (SELECT 1 FROM audit WHERE x = 1) AS a FROM users, orders"
        ));
    }

    #[test]
    fn detects_joins_and_comma_table_lists() {
        assert!(has_join(
            "SELECT * FROM users u JOIN orders o ON o.user_id = u.id"
        ));
        assert!(has_join("select * from users left join orders on true"));
        assert!(has_join("SELECT * FROM users, orders WHERE users.id = orders.user_id"));
    }

    #[test]
    fn column_lists_and_in_lists_are_not_joins() {
        assert!(!has_join("SELECT id, name FROM users"));
        assert!(!has_join("SELECT * FROM users WHERE id IN (1, 2, 3)"));
        assert!(!has_join("SELECT * FROM users ORDER BY name, id"));
        assert!(!has_join("SELECT * FROM users WHERE note = 'a, b JOIN c'"));
    }
}
