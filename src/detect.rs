//! Heuristics for anti-automation interstitials and blocked pages.
//!
//! Most dealer sites sit behind a CDN that mentions Cloudflare somewhere in
//! every page, so detection is deliberately strict: only small pages are ever
//! inspected for challenge wording.

use scraper::{Html, Selector};

/// URL fragments that only appear while a challenge is being served
pub const CHALLENGE_URL_MARKERS: &[&str] = &["challenges.cloudflare.com", "/cdn-cgi/challenge"];
/// URL fragments a browser lands on when the connection itself failed
pub const CONNECTION_ERROR_MARKERS: &[&str] = &["chrome-error://", "err_", "dns_probe"];

const CHALLENGE_TEXT: &[&str] = &["just a moment", "checking your browser"];
const BLOCK_TEXT: &[&str] = &["access denied", "forbidden", "blocked", "unusual traffic"];

/// Pages above this size are real content
pub const SMALL_PAGE: usize = 5000;
const TINY_PAGE: usize = 2000;
const CONTAINER_PAGE: usize = 3000;
const BLOCKED_PAGE: usize = 8000;

pub fn is_challenge_url(url: &str) -> bool {
    let url = url.to_lowercase();
    CHALLENGE_URL_MARKERS.iter().any(|m| url.contains(m))
}

pub fn is_connection_error_url(url: &str) -> bool {
    let url = url.to_lowercase();
    CONNECTION_ERROR_MARKERS.iter().any(|m| url.contains(m))
}

fn has_match(document: &Html, css: &str) -> bool {
    Selector::parse(css)
        .map(|sel| document.select(&sel).next().is_some())
        .unwrap_or(false)
}

/// True when the current page is a bot-challenge interstitial
pub fn is_challenge(url: &str, html: &str) -> bool {
    if is_challenge_url(url) {
        return true;
    }
    let len = html.len();
    if len > SMALL_PAGE {
        return false;
    }

    let lower = html.to_lowercase();
    let document = Html::parse_document(html);

    if CHALLENGE_TEXT.iter().any(|t| lower.contains(t)) {
        if has_match(&document, "#challenge-form, form[action*='challenge']") {
            return true;
        }
        if len < TINY_PAGE {
            return true;
        }
    }

    len < CONTAINER_PAGE && has_match(&document, ".cf-browser-verification, .challenge-container")
}

/// True when a small page carries block wording and none of the usual product markup
pub fn is_blocked(html: &str) -> bool {
    if html.len() >= BLOCKED_PAGE {
        return false;
    }
    let lower = html.to_lowercase();
    if !BLOCK_TEXT.iter().any(|t| lower.contains(t)) {
        return false;
    }
    let document = Html::parse_document(html);
    let product_markup = [
        "span[class*='sku'], span[class*='part-number']",
        "div[class*='price']",
        "button[class*='add-to-cart'], button[class*='cart'], button[class*='buy']",
    ];
    !product_markup.iter().any(|css| has_match(&document, css))
}

/// Loaded page that is neither tiny nor a challenge
pub fn has_real_content(url: &str, html: &str) -> bool {
    html.len() > SMALL_PAGE && !is_challenge_url(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CF_PAGE: &str = r#"<html><head><title>Just a moment...</title></head>
        <body><form id="challenge-form" action="/?__cf_chl_f_tk=x"></form></body></html>"#;

    #[test]
    fn challenge_url_is_definitive() {
        let big = "x".repeat(20_000);
        assert!(is_challenge("https://challenges.cloudflare.com/turnstile", &big));
        assert!(is_challenge("https://parts.example.com/cdn-cgi/challenge-platform/h/b", ""));
    }

    #[test]
    fn small_page_with_form_is_challenge() {
        assert!(is_challenge("https://parts.example.com/", CF_PAGE));
    }

    #[test]
    fn large_page_mentioning_cloudflare_is_not_challenge() {
        let mut page = String::from("<html><body><h1>Wheel</h1><p>Just a moment</p>");
        page.push_str(&"<div>filler</div>".repeat(500));
        page.push_str("</body></html>");
        assert!(!is_challenge("https://parts.example.com/oem-parts/x", &page));
    }

    #[test]
    fn challenge_container_on_small_page() {
        let page = r#"<div class="cf-browser-verification">Please wait</div>"#;
        assert!(is_challenge("https://parts.example.com/", page));
    }

    #[test]
    fn ordinary_small_page_is_not_challenge() {
        assert!(!is_challenge("https://parts.example.com/", "<html><body>Hi</body></html>"));
    }

    #[test]
    fn connection_errors() {
        assert!(is_connection_error_url("chrome-error://chromewebdata/"));
        assert!(is_connection_error_url("about:neterror?e=dns_probe_finished_nxdomain"));
        assert!(!is_connection_error_url("https://parts.example.com/"));
    }

    #[test]
    fn blocked_page_detection() {
        assert!(is_blocked("<html><body><h1>Access Denied</h1></body></html>"));
        let shop = r#"<html><body><p>blocked items</p><span class="sku-display">123</span></body></html>"#;
        assert!(!is_blocked(shop));
    }

    #[test]
    fn only_small_pages_count_as_blocked() {
        let page = |len: usize| {
            let head = "<html><body><h1>Access Denied</h1><p>";
            let tail = "</p></body></html>";
            format!("{}{}{}", head, "x".repeat(len - head.len() - tail.len()), tail)
        };
        assert_eq!(page(7999).len(), 7999);
        assert!(is_blocked(&page(7999)));
        assert!(!is_blocked(&page(8000)));
    }
}
