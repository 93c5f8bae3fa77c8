//! Listing extractors
//!
//! The default `PatternExtractor` matches one literal structural pattern over
//! the raw response text. It is fragile on purpose: markup that deviates from
//! the pattern (attribute reordering, extra whitespace) yields no entry and no
//! error. `MarkupExtractor` parses the document instead and can be selected
//! when the source markup drifts.

mod markup;
mod pattern;

use anyhow::Result;

pub use markup::MarkupExtractor;
pub use pattern::PatternExtractor;

use crate::config::ExtractorKind;
use crate::traits::RecordExtractor;

pub fn build_extractor(kind: ExtractorKind) -> Result<Box<dyn RecordExtractor>> {
    Ok(match kind {
        ExtractorKind::Pattern => Box::new(PatternExtractor::new()?),
        ExtractorKind::Markup => Box::new(MarkupExtractor::new()),
    })
}

/// Decodes the handful of entities the listing markup uses.
///
/// Unknown entities are left as written.
pub(crate) fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];

        let decoded = tail.find(';').and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" | "#39" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => numeric_entity(entity),
            };
            ch.map(|c| (c, end + 1))
        });

        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn numeric_entity(entity: &str) -> Option<char> {
    let digits = entity.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_basic_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("&lt;b&gt; &quot;x&quot; it&#39;s"), "<b> \"x\" it's");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
    }

    #[test]
    fn leaves_unknown_entities_alone() {
        assert_eq!(decode_entities("R&D &bogus; 5 & 6"), "R&D &bogus; 5 & 6");
        assert_eq!(decode_entities("plain"), "plain");
    }

    #[test]
    fn both_extractors_agree_on_well_formed_listing() {
        let html = fixtures::listing();
        let pattern = build_extractor(ExtractorKind::Pattern).unwrap().extract(&html).unwrap();
        let markup = build_extractor(ExtractorKind::Markup).unwrap().extract(&html).unwrap();

        assert_eq!(pattern, markup);
        assert_eq!(pattern.len(), 2);
    }
}
