//! Single left-to-right pass over the raw markup string.
//!
//! Malformed input never fails: unknown tags are dropped, unmatched closes
//! are dropped, stray escapes become literal text.

use super::{ImageRef, MarginDirective, MarginSide, MarkupKind, MarkupToken, TagName};
use crate::style::{Color, FontStyleFlag, HorizontalAlign};

const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    Tag,
    Escape,
}

/// Tokenize formatted text, logging any diagnostics.
pub fn tokenize(raw: &str) -> Vec<MarkupToken> {
    tokenize_with_issues(raw).0
}

/// Tokenize formatted text, returning the diagnostics alongside the tokens.
pub fn tokenize_with_issues(raw: &str) -> (Vec<MarkupToken>, Vec<String>) {
    let mut tokenizer = Tokenizer::default();
    tokenizer.run(raw);
    (tokenizer.tokens, tokenizer.issues)
}

#[derive(Default)]
struct Tokenizer {
    tokens: Vec<MarkupToken>,
    /// Parallel to `tokens`: whether a close has already consumed it.
    closed: Vec<bool>,
    text: String,
    tag: String,
    issues: Vec<String>,
}

impl Tokenizer {
    fn run(&mut self, raw: &str) {
        let mut state = State::Text;

        for ch in raw.chars() {
            match state {
                State::Escape => {
                    match ch {
                        '<' | '>' | ESCAPE => self.text.push(ch),
                        'n' => {
                            self.flush_text();
                            self.push(MarkupKind::Newline);
                        }
                        other => {
                            self.text.push(ESCAPE);
                            self.text.push(other);
                        }
                    }
                    state = State::Text;
                }
                State::Tag => {
                    if ch == '>' {
                        let tag = std::mem::take(&mut self.tag);
                        self.finish_tag(&tag);
                        state = State::Text;
                    } else {
                        self.tag.push(ch);
                    }
                }
                State::Text => match ch {
                    ESCAPE => state = State::Escape,
                    '<' => {
                        self.flush_text();
                        self.tag.clear();
                        state = State::Tag;
                    }
                    ' ' | '\t' => {
                        self.flush_text();
                        let after_space = self.tokens.last().is_some_and(|t| t.is_space());
                        if !after_space {
                            self.push(MarkupKind::Space {
                                trimmable: true,
                                count: 1.0,
                            });
                        }
                    }
                    '\n' | '\r' => {
                        let issue = "Formatted text contains a raw newline; encode line breaks as \\n"
                            .to_string();
                        log::warn!("{}", issue);
                        self.issues.push(issue);
                    }
                    other => self.text.push(other),
                },
            }
        }

        match state {
            State::Escape => self.text.push(ESCAPE),
            State::Tag => {
                log::debug!("Discarding unterminated tag '<{}'", self.tag);
                self.tag.clear();
            }
            State::Text => {}
        }
        self.flush_text();
    }

    fn push(&mut self, kind: MarkupKind) {
        self.tokens.push(MarkupToken::new(kind));
        self.closed.push(false);
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            let text = std::mem::take(&mut self.text);
            self.push(MarkupKind::Text(text));
        }
    }

    fn finish_tag(&mut self, tag: &str) {
        if let Some(name) = tag.strip_prefix('/') {
            self.close_tag(name.trim());
            return;
        }

        let (name, args) = match tag.split_once('=') {
            Some((name, args)) => (name.trim(), args.split(';').map(str::trim).collect()),
            None => (tag.trim(), Vec::new()),
        };

        let Some(tag_name) = TagName::lookup(name) else {
            log::debug!("Dropping unknown tag '<{}>'", tag);
            return;
        };

        match build_kind(tag_name, &args) {
            Some(kind) => self.push(kind),
            None => log::debug!("Dropping tag '<{}>' with unusable arguments", tag),
        }
    }

    fn close_tag(&mut self, name: &str) {
        let name = name.split_once('=').map_or(name, |(n, _)| n).trim();
        let Some(tag_name) = TagName::lookup(name) else {
            log::debug!("Dropping close of unknown tag '</{}>'", name);
            return;
        };

        let opener = (0..self.tokens.len())
            .rev()
            .find(|&i| !self.closed[i] && self.tokens[i].kind.opened_by() == Some(tag_name));

        match opener {
            Some(opener) => {
                self.closed[opener] = true;
                self.push(MarkupKind::Close { opener });
            }
            None => log::debug!("Dropping unmatched close '</{}>'", name),
        }
    }
}

fn arg<'a>(args: &[&'a str], index: usize) -> Option<&'a str> {
    args.get(index).copied().filter(|a| !a.is_empty())
}

fn number(args: &[&str], index: usize) -> Option<f64> {
    arg(args, index)?.parse::<f64>().ok()
}

/// An optional numeric argument: absent, empty or `-` is `Ok(None)`,
/// garbage is `Err(())`.
fn optional_number(args: &[&str], index: usize) -> Result<Option<f64>, ()> {
    match arg(args, index) {
        None | Some("-") => Ok(None),
        Some(v) => v.parse::<f64>().map(Some).map_err(|_| ()),
    }
}

fn image_ref(args: &[&str]) -> Option<ImageRef> {
    let source = arg(args, 0)?.to_string();
    Some(ImageRef {
        source,
        width: optional_number(args, 1).ok()?,
        height: optional_number(args, 2).ok()?,
        x_offset: optional_number(args, 3).ok()?.unwrap_or(0.0),
        y_offset: optional_number(args, 4).ok()?.unwrap_or(0.0),
    })
}

fn margin(side: MarginSide, args: &[&str]) -> Option<MarkupKind> {
    Some(MarkupKind::Margin(MarginDirective {
        side,
        inset: number(args, 0)?,
        height: optional_number(args, 1).ok()?,
    }))
}

fn build_kind(tag: TagName, args: &[&str]) -> Option<MarkupKind> {
    let kind = match tag {
        TagName::Bold => MarkupKind::FontStyle(FontStyleFlag::Bold),
        TagName::Italic => MarkupKind::FontStyle(FontStyleFlag::Italic),
        TagName::Underline => MarkupKind::FontStyle(FontStyleFlag::Underline),
        TagName::Strikeout => MarkupKind::FontStyle(FontStyleFlag::Strikeout),
        TagName::Font => MarkupKind::FontFamily(arg(args, 0)?.to_string()),
        TagName::FontSize => MarkupKind::FontSize(number(args, 0).filter(|s| *s > 0.0)?),
        TagName::FontColor => MarkupKind::FontColor(Color::parse(arg(args, 0)?)?),
        TagName::BackgroundColor => MarkupKind::BackgroundColor(Color::parse(arg(args, 0)?)?),
        TagName::BackgroundImage => MarkupKind::BackgroundImage(image_ref(args)?),
        TagName::Image => MarkupKind::Image(image_ref(args)?),
        TagName::Spacing => MarkupKind::Space {
            trimmable: false,
            count: optional_number(args, 0).ok()?.unwrap_or(1.0),
        },
        TagName::XOffset => MarkupKind::XOffset(number(args, 0)?),
        TagName::YOffset => MarkupKind::YOffset(number(args, 0)?),
        TagName::LineSpace => MarkupKind::LineSpace(number(args, 0)?),
        TagName::AlignLeft => MarkupKind::Align(HorizontalAlign::Left),
        TagName::AlignCenter => MarkupKind::Align(HorizontalAlign::Center),
        TagName::AlignRight => MarkupKind::Align(HorizontalAlign::Right),
        TagName::MarginLeft => return margin(MarginSide::Left, args),
        TagName::MarginRight => return margin(MarginSide::Right, args),
        TagName::Push => MarkupKind::Push,
        TagName::Break => MarkupKind::Newline,
    };
    Some(kind)
}
