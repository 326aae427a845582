// Response lines: `[tag] ddd<sep>text`.
//
// `<sep>` is `-` when more lines of the same response follow and a space
// (or nothing) on the final line.

use crate::error::Error;

/// Status codes this client interprets. Anything >= 400 is an error.
pub mod status {
    pub const OK: u16 = 200;
    pub const SERVICE_READY: u16 = 201;
    pub const OBJECT_STATUS: u16 = 300;
    pub const XML_BEGIN: u16 = 343;
    pub const XML_END: u16 = 344;
    pub const XML_LINE: u16 = 347;
    pub const FIRST_ERROR: u16 = 400;
}

/// One parsed response line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    /// Command tag echoed by the gateway, if the line carried one.
    pub tag: Option<u32>,
    pub code: u16,
    /// `true` when further lines of this response follow.
    pub more: bool,
    pub text: String,
}

impl ResponseLine {
    pub fn parse(line: &str) -> Result<Self, Error> {
        let (tag, rest) = match line.strip_prefix('[') {
            Some(after) => {
                let (tag_text, rest) = after
                    .split_once(']')
                    .ok_or_else(|| Error::protocol(line, "unterminated command tag"))?;
                let tag = tag_text
                    .parse::<u32>()
                    .map_err(|_| Error::protocol(line, format!("invalid command tag '{tag_text}'")))?;
                (Some(tag), rest.trim_start())
            }
            None => (None, line),
        };

        let code_text = rest
            .get(..3)
            .filter(|c| c.bytes().all(|b| b.is_ascii_digit()))
            .ok_or_else(|| Error::protocol(line, "missing three-digit status code"))?;
        let code = code_text
            .parse::<u16>()
            .map_err(|_| Error::protocol(line, "invalid status code"))?;

        let after_code = rest.get(3..).unwrap_or_default();
        let (more, text) = match after_code.as_bytes().first() {
            None => (false, ""),
            Some(b'-') => (true, after_code.get(1..).unwrap_or_default()),
            Some(b' ') => (false, after_code.get(1..).unwrap_or_default()),
            Some(_) => {
                return Err(Error::protocol(line, "status code must be followed by ' ' or '-'"));
            }
        };

        Ok(Self {
            tag,
            code,
            more,
            text: text.to_owned(),
        })
    }

    pub fn is_final(&self) -> bool {
        !self.more
    }

    pub fn is_error(&self) -> bool {
        self.code >= status::FIRST_ERROR
    }
}
