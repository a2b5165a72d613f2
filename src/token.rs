use serde::{Deserialize, Serialize};

/// One unit of lexer output.
///
/// Only the length of a token matters to projection. Typed tokens may hold
/// nested tokens, which contribute length but are never projected on their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    Literal(String),
    Typed {
        kind: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alias: Option<String>,
        content: Content,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    Text(String),
    Nested(Vec<Token>),
}

impl Token {
    pub fn literal(text: impl Into<String>) -> Self {
        Token::Literal(text.into())
    }

    pub fn typed(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Token::Typed {
            kind: kind.into(),
            alias: None,
            content: Content::Text(text.into()),
        }
    }

    pub fn nested(kind: impl Into<String>, children: Vec<Token>) -> Self {
        Token::Typed {
            kind: kind.into(),
            alias: None,
            content: Content::Nested(children),
        }
    }

    pub fn with_alias(self, alias: impl Into<String>) -> Self {
        match self {
            Token::Typed { kind, content, .. } => Token::Typed {
                kind,
                alias: Some(alias.into()),
                content,
            },
            literal => literal,
        }
    }

    /// Length in characters, summed through nested content.
    pub fn len(&self) -> usize {
        match self {
            Token::Literal(text) => text.chars().count(),
            Token::Typed { content, .. } => content.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Token::Literal(_) => None,
            Token::Typed { kind, .. } => Some(kind),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            Token::Literal(_) => None,
            Token::Typed { alias, .. } => alias.as_deref(),
        }
    }

    /// Reassembles the covered source text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Token::Literal(text) => out.push_str(text),
            Token::Typed { content, .. } => match content {
                Content::Text(text) => out.push_str(text),
                Content::Nested(children) => {
                    for child in children {
                        child.write_text(out);
                    }
                }
            },
        }
    }
}

impl Content {
    pub fn len(&self) -> usize {
        match self {
            Content::Text(text) => text.chars().count(),
            Content::Nested(children) => total_len(children),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn total_len(tokens: &[Token]) -> usize {
    tokens.iter().map(Token::len).sum()
}

#[cfg(test)]
mod tests {
    use super::{total_len, Token};

    #[test]
    fn literal_and_typed_lengths() {
        assert_eq!(Token::literal("abc").len(), 3);
        assert_eq!(Token::typed("title", "# Hi").len(), 4);
        assert_eq!(Token::typed("code", "`é`").len(), 3);
    }

    #[test]
    fn nested_length_sums_children_recursively() {
        let token = Token::nested(
            "bold",
            vec![
                Token::typed("punctuation", "**"),
                Token::literal("a "),
                Token::nested(
                    "italic",
                    vec![
                        Token::typed("punctuation", "_"),
                        Token::literal("b"),
                        Token::typed("punctuation", "_"),
                    ],
                ),
                Token::typed("punctuation", "**"),
            ],
        );
        assert_eq!(token.len(), 9);
        assert_eq!(token.text(), "**a _b_**");
    }

    #[test]
    fn empty_nested_token_has_zero_length() {
        let token = Token::nested("bold", Vec::new());
        assert!(token.is_empty());
    }

    #[test]
    fn alias_only_applies_to_typed_tokens() {
        assert_eq!(Token::typed("hr", "---").with_alias("punctuation").alias(), Some("punctuation"));
        assert_eq!(Token::literal("x").with_alias("punctuation").alias(), None);
        assert_eq!(Token::literal("x").kind(), None);
    }

    #[test]
    fn total_len_covers_mixed_stream() {
        let tokens = vec![
            Token::literal("a"),
            Token::typed("bold", "**b**"),
            Token::literal("\n"),
        ];
        assert_eq!(total_len(&tokens), 7);
    }
}
