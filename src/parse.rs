//! Text and selector helpers shared by all site templates.

use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Included keywords. Single words match on word boundaries, phrases as substrings.
pub const WHEEL_KEYWORDS: &[&str] = &[
    "wheel cap",
    "wheel kit",
    "hub cap",
    "center cap",
    "hubcap",
    "wheel cover",
    "alloy wheel",
    "steel wheel",
    "aluminum wheel",
    "chrome wheel",
    "spoke wheel",
    "forged wheel",
    "cast wheel",
    "custom wheel",
    "spare wheel",
    "disc wheel",
    "wheel disc",
    "wheel disk",
    "wheel rim",
    "wheel assembly",
    "rim cap",
    "complete wheel",
    "berlina black",
    "rim",
    "rims",
    "alloy",
    "wheel",
    "wheels",
    "disk",
];

/// Wheel-adjacent parts that are not wheels
pub const EXCLUDE_KEYWORDS: &[&str] = &[
    "steering wheel",
    "wheel flange",
    "wheel bearing",
    "wheel spacer",
    "bearing hub",
    "hub bearing",
    "wheel hub",
    "bearing assembly",
    "wheel nut",
    "wheel stud",
    "wheel bolt",
    "wheel valve",
    "wheel weight",
    "wheel arch",
    "wheel well",
    "wheel sensor",
    "wheel speed sensor",
    "wheel cylinder",
    "wheel seal",
    "lug nut",
    "lug bolt",
    "tire pressure",
    "tpms",
    "wheel lock nut",
    "wheel lock key",
    "wheel alignment",
    "wheel opening",
    "wheel house",
    "wheel liner",
    "wheel adapter",
    "wheel mounting kit",
];

fn single_word_patterns() -> &'static Vec<(&'static str, Regex)> {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        WHEEL_KEYWORDS
            .iter()
            .filter(|k| !k.contains(' '))
            .filter_map(|k| {
                Regex::new(&format!(r"\b{}\b", regex::escape(k)))
                    .ok()
                    .map(|re| (*k, re))
            })
            .collect()
    })
}

/// Whether a listing is a wheel, rim or wheel cap rather than some other wheel part
pub fn is_wheel_product(title: &str, description: &str) -> bool {
    let text = format!("{} {}", title, description)
        .to_lowercase()
        .replace(['-', '_'], " ");

    if let Some(hit) = EXCLUDE_KEYWORDS.iter().find(|k| text.contains(*k)) {
        log::debug!("Excluded '{}' - matched '{}'", title, hit);
        return false;
    }

    let singles = single_word_patterns();
    for keyword in WHEEL_KEYWORDS {
        let matched = if keyword.contains(' ') {
            text.contains(keyword)
        } else {
            singles
                .iter()
                .find(|(k, _)| k == keyword)
                .map(|(_, re)| re.is_match(&text))
                .unwrap_or(false)
        };
        if matched {
            log::debug!("Included '{}' - matched '{}'", title, keyword);
            return true;
        }
    }

    log::debug!("No wheel keyword in '{}'", title);
    false
}

/// Alphanumerics only
pub fn clean_sku(sku: &str) -> String {
    sku.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Digits and dots only, e.g. `"$1,234.50"` -> `"1234.50"`
pub fn extract_price(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect()
}

pub fn collapse_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Parse a selector that is known at compile time
pub fn sel(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid built-in selector '{}': {}", css, e))
}

/// Whitespace-collapsed text of an element
pub fn element_text(el: &ElementRef) -> String {
    collapse_ws(&el.text().collect::<Vec<_>>().join(" "))
}

/// Text of the first element matching `css`, if non-empty
pub fn select_text(document: &Html, css: &str) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document
        .select(&selector)
        .map(|el| element_text(&el))
        .find(|t| !t.is_empty())
}

/// First non-empty text over several selectors, in order
pub fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|css| select_text(document, css))
}

/// Value of the first of `attrs` present on the first element matching `css`
pub fn select_attr(document: &Html, css: &str, attrs: &[&str]) -> Option<String> {
    let selector = Selector::parse(css).ok()?;
    document.select(&selector).find_map(|el| {
        attrs
            .iter()
            .find_map(|a| el.value().attr(a))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

/// Number of characters of visible text in `<body>`
pub fn body_text_len(html: &str) -> usize {
    let document = Html::parse_document(html);
    let body = sel("body");
    document
        .select(&body)
        .next()
        .map(|b| b.text().map(|t| t.trim().len()).sum())
        .unwrap_or(0)
}

/// Resolve `href` against `base`; protocol-relative links become https
pub fn absolutize(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    base.join(href).ok().map(|u| u.to_string())
}

/// Canonical product URL: no fragment, no query, no trailing slash
pub fn normalize_product_url(url: &str) -> String {
    let url = url.split('#').next().unwrap_or(url);
    let url = url.split('?').next().unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// Image URLs sometimes come protocol-relative
pub fn fix_image_url(src: &str) -> String {
    match src.strip_prefix("//") {
        Some(rest) => format!("https://{}", rest),
        None => src.to_string(),
    }
}

/// Strip a leading label such as `"Part Number:"`
pub fn strip_label(text: &str, label: &str) -> String {
    let words: Vec<String> = label.split_whitespace().map(regex::escape).collect();
    let re = Regex::new(&format!(r"(?i)^\s*{}\s*:?\s*", words.join(r"\s*")));
    match re {
        Ok(re) => re.replace(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wheel_detection() {
        assert!(is_wheel_product("18\" Alloy Wheel", ""));
        assert!(is_wheel_product("Center Cap - Chrome", ""));
        assert!(is_wheel_product("Wheel, Aluminum", ""));
        assert!(is_wheel_product("Acura Disk (18X8J)", ""));
        assert!(is_wheel_product("Hub-Cap", ""));
        assert!(!is_wheel_product("Steering Wheel Assembly", ""));
        assert!(!is_wheel_product("Wheel Bearing", "front"));
        assert!(!is_wheel_product("Lug Nut", ""));
        assert!(!is_wheel_product("TPMS Sensor", ""));
        assert!(!is_wheel_product("Oil Filter", ""));
    }

    #[test]
    fn rim_needs_word_boundary() {
        assert!(is_wheel_product("Rim", ""));
        assert!(!is_wheel_product("Trim Panel", ""));
        assert!(!is_wheel_product("Primer", ""));
    }

    #[test]
    fn wheel_locks_only_exclude_nuts_and_keys() {
        assert!(is_wheel_product("Wheel Lock Set", ""));
        assert!(!is_wheel_product("Wheel Lock Nut", ""));
        assert!(!is_wheel_product("Wheel-Lock Key", ""));
        assert!(is_wheel_product("Berlina Black Finish 20x8.5", ""));
    }

    #[test]
    fn sku_and_price_cleaning() {
        assert_eq!(clean_sku("84-585-383 A"), "84585383A");
        assert_eq!(clean_sku(""), "");
        assert_eq!(extract_price("$1,234.50"), "1234.50");
        assert_eq!(extract_price("MSRP: $787.31"), "787.31");
    }

    #[test]
    fn selector_helpers() {
        let doc = Html::parse_document(
            r#"<div><h1 class="x">  </h1><h1>Real   Title</h1><img class="p" data-src="//cdn.test/a.jpg"></div>"#,
        );
        assert_eq!(select_text(&doc, "h1").as_deref(), Some("Real Title"));
        assert_eq!(first_text(&doc, &["h2", "h1"]).as_deref(), Some("Real Title"));
        assert_eq!(
            select_attr(&doc, "img.p", &["src", "data-src"]).as_deref(),
            Some("//cdn.test/a.jpg")
        );
        assert!(select_text(&doc, "h3").is_none());
    }

    #[test]
    fn url_helpers() {
        let base = Url::parse("https://www.tascaparts.com/search?search_str=wheel").unwrap();
        assert_eq!(
            absolutize(&base, "/oem-parts/gm-wheel-84585383").as_deref(),
            Some("https://www.tascaparts.com/oem-parts/gm-wheel-84585383")
        );
        assert_eq!(absolutize(&base, "#top"), None);
        assert_eq!(
            normalize_product_url("https://x.test/oem-parts/a/?page=2#reviews"),
            "https://x.test/oem-parts/a"
        );
        assert_eq!(fix_image_url("//cdn.test/i.png"), "https://cdn.test/i.png");
    }

    #[test]
    fn label_stripping() {
        assert_eq!(strip_label("Part Number: 8R0-601-025", "Part Number"), "8R0-601-025");
        assert_eq!(strip_label("PartNumber 123", "Part Number"), "123");
        assert_eq!(strip_label("Product Description - nice", "Product Description"), "- nice");
    }
}
