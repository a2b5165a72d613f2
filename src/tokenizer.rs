use crate::grammar::{Grammar, GrammarSet, Pattern, Rule};
use crate::token::{Content, Token};

/// Grammars that refer back to themselves stop nesting at this depth; deeper
/// matches keep their text unsplit.
const MAX_DEPTH: usize = 32;

/// Anything that can turn text into tokens covering it exactly.
pub trait Lexer {
    fn tokenize(&self, text: &str) -> Vec<Token>;
}

impl<F> Lexer for F
where
    F: Fn(&str) -> Vec<Token>,
{
    fn tokenize(&self, text: &str) -> Vec<Token> {
        self(text)
    }
}

/// Rule-table tokenizer driven by a [`GrammarSet`].
#[derive(Debug, Clone)]
pub struct Tokenizer {
    grammars: GrammarSet,
}

impl Tokenizer {
    pub fn new(grammars: GrammarSet) -> Self {
        Self { grammars }
    }

    pub fn markdown() -> Self {
        Self::new(GrammarSet::markdown())
    }

    fn run(&self, text: &str, grammar: &Grammar, depth: usize) -> Vec<Token> {
        if text.is_empty() {
            return Vec::new();
        }
        // Unmatched text is kept as literals; only literals are scanned.
        let mut pieces = vec![Token::Literal(text.to_string())];
        for rule in &grammar.rules {
            for pattern in &rule.patterns {
                pieces = self.apply_pattern(pieces, rule, pattern, depth);
            }
        }
        pieces
    }

    fn apply_pattern(
        &self,
        pieces: Vec<Token>,
        rule: &Rule,
        pattern: &Pattern,
        depth: usize,
    ) -> Vec<Token> {
        let mut out = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let Token::Literal(fragment) = piece else {
                out.push(piece);
                continue;
            };
            // The text after each match is scanned again, so later matches
            // on the same line are found too.
            let mut rest = fragment.as_str();
            while let Some(range) = pattern.find(rest) {
                let before = &rest[..range.start];
                if !before.is_empty() {
                    out.push(Token::Literal(before.to_string()));
                }
                out.push(self.typed_token(&rest[range.clone()], rule, pattern, depth));
                rest = &rest[range.end..];
            }
            if !rest.is_empty() {
                out.push(Token::Literal(rest.to_string()));
            }
        }
        out
    }

    fn typed_token(&self, matched: &str, rule: &Rule, pattern: &Pattern, depth: usize) -> Token {
        let content = match pattern.inside.as_deref() {
            Some(name) if depth < MAX_DEPTH => match self.grammars.get(name) {
                Some(inner) => Content::Nested(self.run(matched, inner, depth + 1)),
                None => Content::Text(matched.to_string()),
            },
            _ => Content::Text(matched.to_string()),
        };
        Token::Typed {
            kind: rule.kind.clone(),
            alias: rule.alias.clone(),
            content,
        }
    }
}

impl Lexer for Tokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        self.run(text, self.grammars.root(), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Tokenizer};
    use crate::grammar::GrammarSet;
    use crate::token::{total_len, Content, Token};
    use proptest::prelude::*;

    fn kinds(tokens: &[Token]) -> Vec<Option<&str>> {
        tokens.iter().map(Token::kind).collect()
    }

    fn joined(tokens: &[Token]) -> String {
        tokens.iter().map(Token::text).collect()
    }

    #[test]
    fn empty_text_yields_no_tokens() {
        assert!(Tokenizer::markdown().tokenize("").is_empty());
    }

    #[test]
    fn atx_title_is_one_typed_token() {
        let tokens = Tokenizer::markdown().tokenize("# Hi");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind(), Some("title"));
        assert_eq!(tokens[0].alias(), Some("important"));
        assert_eq!(tokens[0].len(), 4);
        let Token::Typed {
            content: Content::Nested(children),
            ..
        } = &tokens[0]
        else {
            panic!("title should carry nested tokens");
        };
        assert_eq!(kinds(children), vec![Some("punctuation"), None]);
    }

    #[test]
    fn bold_keeps_preceding_character_as_literal() {
        let tokens = Tokenizer::markdown().tokenize("a **b** c");
        assert_eq!(kinds(&tokens), vec![None, Some("bold"), None]);
        assert_eq!(tokens[0], Token::literal("a "));
        assert_eq!(tokens[1].text(), "**b**");
    }

    #[test]
    fn later_matches_in_same_fragment_are_found() {
        let tokens = Tokenizer::markdown().tokenize("`a` and `b`");
        assert_eq!(kinds(&tokens), vec![Some("code"), None, Some("code")]);
    }

    #[test]
    fn bold_contains_nested_italic() {
        let tokens = Tokenizer::markdown().tokenize("**a *b* c**");
        assert_eq!(tokens.len(), 1);
        let Token::Typed {
            content: Content::Nested(children),
            ..
        } = &tokens[0]
        else {
            panic!("bold should nest");
        };
        assert!(children.iter().any(|t| t.kind() == Some("italic")));
    }

    #[test]
    fn multi_line_document_covers_input() {
        let text = "Title\n=====\n\n> quote\n- item\n\n---\n[link](http://x.y \"t\")\n";
        let tokens = Tokenizer::markdown().tokenize(text);
        assert_eq!(joined(&tokens), text);
        assert_eq!(total_len(&tokens), text.chars().count());
        let found: Vec<&str> = tokens.iter().filter_map(Token::kind).collect();
        assert_eq!(found, vec!["title", "blockquote", "list", "hr", "url"]);
    }

    #[test]
    fn every_match_in_a_long_fragment_is_found() {
        let text = "`x` ".repeat(500);
        let tokens = Tokenizer::markdown().tokenize(&text);
        assert_eq!(tokens.len(), 1000);
        assert_eq!(tokens.iter().filter(|t| t.kind() == Some("code")).count(), 500);
        assert_eq!(joined(&tokens), text);
    }

    #[test]
    fn lookbehind_after_multibyte_prefix_splits_cleanly() {
        let set = GrammarSet::from_toml(
            r#"
root = "g"
[[grammar.g]]
kind = "tail"
patterns = [{ regex = 'é(x)y', lookbehind = true }]
"#,
        )
        .expect("grammar loads");
        let tokens = Tokenizer::new(set).tokenize("éxy");
        assert_eq!(tokens, vec![Token::literal("éx"), Token::typed("tail", "y")]);
    }

    #[test]
    fn closures_act_as_lexers() {
        let lexer = |text: &str| vec![Token::typed("all", text)];
        let tokens = lexer.tokenize("abc");
        assert_eq!(tokens, vec![Token::typed("all", "abc")]);
    }

    #[test]
    fn self_referencing_grammar_terminates() {
        let set = GrammarSet::from_toml(
            r#"
root = "g"
[[grammar.g]]
kind = "loop"
patterns = [{ regex = '.+', inside = "g" }]
"#,
        )
        .expect("grammar loads");
        let tokens = Tokenizer::new(set).tokenize("abc");
        assert_eq!(total_len(&tokens), 3);
    }

    proptest! {
        #[test]
        fn tokens_cover_arbitrary_markdown(text in "[-#*_`>\\[\\]()=a-z0-9 \n]{0,80}") {
            let tokens = Tokenizer::markdown().tokenize(&text);
            prop_assert_eq!(joined(&tokens), text.clone());
            prop_assert_eq!(total_len(&tokens), text.chars().count());
            prop_assert!(tokens.iter().all(|t| !t.is_empty()));
        }
    }
}
