// src/feed.rs
// Well-formedness check for syndication documents (RSS 2.0, RSS 1.0/RDF, Atom)

use roxmltree::{Document, Node, ParsingOptions};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Rss => write!(f, "RSS"),
            FeedKind::Rdf => write!(f, "RSS 1.0"),
            FeedKind::Atom => write!(f, "Atom"),
        }
    }
}

/// Content types a feed may legitimately be served with.
pub fn is_feed_content_type(content_type: &str) -> bool {
    match content_type.parse::<mime::Mime>() {
        Ok(parsed) => {
            let subtype = parsed.subtype().as_str();
            let suffix_xml = parsed.suffix().map(|s| s.as_str()) == Some("xml");
            subtype == "xml" || suffix_xml || subtype == "rss"
        }
        Err(_) => false,
    }
}

const RDF_NS: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";

/// Parse the document as XML and check that its root is a known feed element.
///
/// Undefined entities, a bare '&', attributes without a value and duplicate
/// attributes are all parse errors. A DOCTYPE with an internal subset is allowed.
pub fn check_feed(body: &str) -> Result<FeedKind, String> {
    let text = body.trim_start_matches('\u{feff}');
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(text, options).map_err(|e| e.to_string())?;

    let root = doc.root_element();
    let name = root.tag_name().name();
    match name {
        "rss" if has_child(root, "channel") => Ok(FeedKind::Rss),
        "rss" => Err("<rss> has no <channel>".to_string()),
        "RDF" if root.tag_name().namespace() == Some(RDF_NS) => Ok(FeedKind::Rdf),
        "feed" => Ok(FeedKind::Atom),
        other => Err(format!("unexpected root element <{}>", other)),
    }
}

fn has_child(node: Node<'_, '_>, name: &str) -> bool {
    node.children()
        .any(|child| child.is_element() && child.tag_name().name() == name)
}
