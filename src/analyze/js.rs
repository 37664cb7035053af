//! JavaScript probes evaluated inside analyzed pages.
//!
//! Each constant is passed verbatim to `Page::eval`. Probes either return
//! a plain value or a promise; the driver awaits promises before replying.

/// Navigation timing: time to first byte and DOMContentLoaded, in ms.
pub(crate) const NAV_TIMING: &str = r#"
() => {
    const nav = performance.getEntriesByType('navigation')[0];
    return {
        ttfb: nav ? nav.responseStart : null,
        domContentLoaded: nav ? nav.domContentLoadedEventEnd : null,
    };
}
"#;

/// Cumulative layout shift, summed over 3 seconds of observation.
pub(crate) const CUMULATIVE_LAYOUT_SHIFT: &str = r#"
() => new Promise(resolve => {
    let clsValue = 0;
    new PerformanceObserver(list => {
        for (const entry of list.getEntries()) {
            if (!entry.hadRecentInput) clsValue += entry.value;
        }
        resolve(clsValue);
    }).observe({type: 'layout-shift', buffered: true});
    setTimeout(() => resolve(clsValue), 3000);
})
"#;

/// Largest contentful paint start time in ms, or null if none painted.
pub(crate) const LARGEST_CONTENTFUL_PAINT: &str = r#"
() => new Promise(resolve => {
    new PerformanceObserver(list => {
        const entries = list.getEntries();
        resolve(entries.length > 0 ? entries[entries.length - 1].startTime : null);
    }).observe({type: 'largest-contentful-paint', buffered: true});
    setTimeout(() => resolve(null), 3000);
})
"#;

/// Visible word count.
pub(crate) const WORD_COUNT: &str =
    "() => document.body.innerText.split(/\\s+/).filter(w => w.length > 0).length";

/// Full body text, lowercased, for keyword scans.
pub(crate) const PAGE_TEXT: &str = "() => document.body.innerText.toLowerCase()";

/// JSON-LD @type values, including those nested under @graph.
pub(crate) const SCHEMA_TYPES: &str = r#"
() => {
    const scripts = document.querySelectorAll('script[type="application/ld+json"]');
    const types = [];
    scripts.forEach(s => {
        try {
            const data = JSON.parse(s.textContent);
            if (data['@type']) types.push(data['@type']);
            if (Array.isArray(data['@graph'])) {
                data['@graph'].forEach(item => { if (item['@type']) types.push(item['@type']); });
            }
        } catch(e) {}
    });
    return types;
}
"#;

/// Document scroll width; wider than the window means horizontal scroll.
pub(crate) const SCROLL_WIDTH: &str = "document.documentElement.scrollWidth";

/// Window inner width.
pub(crate) const INNER_WIDTH: &str = "window.innerWidth";

/// Computed base font size of the body, in px.
pub(crate) const BASE_FONT_SIZE: &str =
    "() => parseFloat(window.getComputedStyle(document.body).fontSize)";
