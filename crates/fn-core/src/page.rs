//! Page-URL helpers: is this a diagram page, and which diagram is open.

use crate::id::DiagramId;
use url::Url;

/// Path fragment identifying the diagram editor page.
pub const BUILDER_PATH: &str = "/builder_platform_interaction/flowBuilder.app";

/// Query parameter carrying the diagram id.
pub const DIAGRAM_ID_PARAM: &str = "flowId";

/// Whether `href` points at the diagram editor.
pub fn is_diagram_page(href: &str, builder_path: &str) -> bool {
    href.contains(builder_path)
}

/// Extract the diagram id from the page URL's query string.
///
/// Returns `None` for unparsable URLs or a missing/empty parameter.
pub fn diagram_id_from_url(href: &str, param: &str) -> Option<DiagramId> {
    let url = match Url::parse(href) {
        Ok(u) => u,
        Err(e) => {
            log::warn!("cannot parse page URL {href:?}: {e}");
            return None;
        }
    };
    url.query_pairs()
        .find(|(k, _)| k == param)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
        .map(DiagramId::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HREF: &str =
        "https://acme.lightning.force.com/builder_platform_interaction/flowBuilder.app?flowId=301Ab000000x1yZ&retUrl=%2Fhome";

    #[test]
    fn detects_builder_page() {
        assert!(is_diagram_page(HREF, BUILDER_PATH));
        assert!(!is_diagram_page("https://acme.lightning.force.com/lightning/page/home", BUILDER_PATH));
    }

    #[test]
    fn extracts_diagram_id() {
        assert_eq!(
            diagram_id_from_url(HREF, DIAGRAM_ID_PARAM),
            Some(DiagramId::new("301Ab000000x1yZ"))
        );
        assert_eq!(diagram_id_from_url("https://x.test/?flowId=", DIAGRAM_ID_PARAM), None);
        assert_eq!(diagram_id_from_url("not a url", DIAGRAM_ID_PARAM), None);
    }
}
