//! JavaScript evaluation scripts
//!
//! Each script returns raw signals as a JSON object whose keys match the
//! corresponding section struct. Scores are computed in Rust.

/// Core accessibility signals, plus selectors of offending elements
pub const ACCESSIBILITY_SCRIPT: &str = r#"
    (() => {
        const cssPath = el => {
            if (el.id) return '#' + el.id;
            const parts = [];
            while (el && el.nodeType === 1 && parts.length < 4) {
                let part = el.tagName.toLowerCase();
                if (el.classList.length) part += '.' + el.classList[0];
                parts.unshift(part);
                el = el.parentElement;
            }
            return parts.join(' > ');
        };

        const images = Array.from(document.images);
        const missingAlt = images.filter(img => !img.hasAttribute('alt'));

        const controls = Array.from(document.querySelectorAll(
            'input:not([type=hidden]):not([type=submit]):not([type=button]), select, textarea'
        ));
        const unlabeled = controls.filter(c => {
            if (c.getAttribute('aria-label') || c.getAttribute('aria-labelledby')) return false;
            if (c.id && document.querySelector('label[for="' + CSS.escape(c.id) + '"]')) return false;
            return !c.closest('label');
        });

        return {
            images_total: images.length,
            images_missing_alt: missingAlt.length,
            form_controls_unlabeled: unlabeled.length,
            headings_total: document.querySelectorAll('h1, h2, h3, h4, h5, h6').length,
            landmarks_total: document.querySelectorAll(
                'main, nav, header, footer, aside, [role=main], [role=navigation], [role=banner], [role=contentinfo]'
            ).length,
            has_lang: !!document.documentElement.getAttribute('lang'),
            missing_alt_selectors: missingAlt.slice(0, 20).map(cssPath),
            unlabeled_selectors: unlabeled.slice(0, 20).map(cssPath)
        };
    })()
"#;

/// Navigation timing from the Performance API
pub const PERFORMANCE_SCRIPT: &str = r#"
    (() => {
        const nav = performance.getEntriesByType('navigation')[0];
        const paint = performance.getEntriesByType('paint')
            .find(p => p.name === 'first-contentful-paint');
        const resources = performance.getEntriesByType('resource');
        return {
            time_to_first_byte_ms: nav ? nav.responseStart - nav.requestStart : 0,
            first_contentful_paint_ms: paint ? paint.startTime : null,
            dom_content_loaded_ms: nav ? nav.domContentLoadedEventEnd : 0,
            load_complete_ms: nav ? nav.loadEventEnd : 0,
            transfer_size_bytes: (nav ? nav.transferSize : 0)
                + resources.reduce((sum, r) => sum + (r.transferSize || 0), 0),
            resource_count: resources.length
        };
    })()
"#;

/// Extended rule checks; each entry is `[rule, violation count]`
pub const PA11Y_SCRIPT: &str = r#"
    (() => {
        const ids = Array.from(document.querySelectorAll('[id]')).map(e => e.id);
        const dupIds = ids.length - new Set(ids).size;
        const text = el => (el.textContent || '').trim() || el.getAttribute('aria-label')
            || el.getAttribute('title') || (el.querySelector('img[alt]')?.alt || '');
        const rules = [
            ['link-name', Array.from(document.querySelectorAll('a[href]')).filter(a => !text(a)).length],
            ['button-name', Array.from(document.querySelectorAll('button')).filter(b => !text(b)).length],
            ['duplicate-id', dupIds],
            ['tabindex', document.querySelectorAll('[tabindex]:not([tabindex="0"]):not([tabindex^="-"])').length],
            ['frame-title', document.querySelectorAll('iframe:not([title])').length],
            ['document-title', document.title.trim() ? 0 : 1],
            ['meta-refresh', document.querySelectorAll('meta[http-equiv="refresh"]').length]
        ];
        const notices = document.querySelectorAll('[aria-hidden="true"] a, [aria-hidden="true"] button').length;
        return { rules, notices };
    })()
"#;

pub const SEO_SCRIPT: &str = r#"
    (() => {
        const description = document.querySelector('meta[name="description"]');
        const words = (document.body ? document.body.innerText : '').split(/\s+/).filter(Boolean);
        return {
            title: document.title.trim() || null,
            meta_description: description ? (description.getAttribute('content') || '').trim() || null : null,
            h1_count: document.querySelectorAll('h1').length,
            word_count: words.length
        };
    })()
"#;

pub const SOCIAL_SCRIPT: &str = r#"
    (() => ({
        open_graph_tags: document.querySelectorAll('meta[property^="og:"]').length,
        twitter_tags: document.querySelectorAll('meta[name^="twitter:"]').length,
        has_og_image: !!document.querySelector('meta[property="og:image"][content]')
    }))()
"#;

pub const TECHNICAL_SEO_SCRIPT: &str = r#"
    (() => {
        const robots = document.querySelector('meta[name="robots"]');
        const links = Array.from(document.querySelectorAll('a[href]'))
            .map(a => { try { return new URL(a.href, location.href); } catch (e) { return null; } })
            .filter(u => u && (u.protocol === 'http:' || u.protocol === 'https:'));
        const internal = links.filter(u => u.host === location.host).length;
        return {
            canonical: document.querySelector('link[rel="canonical"]')?.href || null,
            noindex: !!robots && /noindex/i.test(robots.getAttribute('content') || ''),
            hreflang_count: document.querySelectorAll('link[rel="alternate"][hreflang]').length,
            internal_links: internal,
            external_links: links.length - internal
        };
    })()
"#;

pub const SECURITY_SCRIPT: &str = r#"
    (() => {
        const https = location.protocol === 'https:';
        const insecure = sel => Array.from(document.querySelectorAll(sel))
            .filter(el => (el.src || el.href || '').startsWith('http:')).length;
        return {
            https,
            mixed_content_count: https
                ? insecure('img[src], script[src], iframe[src], link[rel="stylesheet"][href], video[src], audio[src]')
                : 0,
            insecure_form_actions: Array.from(document.forms)
                .filter(f => (f.action || '').startsWith('http:')).length,
            external_scripts_without_integrity: Array.from(document.querySelectorAll('script[src]'))
                .filter(s => { try { return new URL(s.src).host !== location.host; } catch (e) { return false; } })
                .filter(s => !s.integrity).length
        };
    })()
"#;

pub const STRUCTURED_DATA_SCRIPT: &str = r#"
    (() => {
        const blocks = Array.from(document.querySelectorAll('script[type="application/ld+json"]'));
        const types = new Set();
        let invalid = 0;
        const collect = node => {
            if (Array.isArray(node)) { node.forEach(collect); return; }
            if (node && typeof node === 'object') {
                const t = node['@type'];
                if (typeof t === 'string') types.add(t);
                if (Array.isArray(t)) t.forEach(x => types.add(String(x)));
                if (node['@graph']) collect(node['@graph']);
            }
        };
        blocks.forEach(b => {
            try { collect(JSON.parse(b.textContent)); } catch (e) { invalid += 1; }
        });
        document.querySelectorAll('[itemscope][itemtype]').forEach(el => {
            const t = el.getAttribute('itemtype').split('/').pop();
            if (t) types.add(t);
        });
        return {
            json_ld_blocks: blocks.length,
            invalid_json_ld_blocks: invalid,
            microdata_items: document.querySelectorAll('[itemscope]').length,
            schema_types: Array.from(types).sort()
        };
    })()
"#;

pub const MOBILE_SCRIPT: &str = r#"
    (() => {
        const targets = Array.from(document.querySelectorAll('a[href], button, input, select, textarea'))
            .map(el => el.getBoundingClientRect())
            .filter(r => r.width > 0 && r.height > 0 && (r.width < 24 || r.height < 24));
        const size = parseFloat(getComputedStyle(document.body || document.documentElement).fontSize);
        return {
            has_viewport_meta: !!document.querySelector('meta[name="viewport"]'),
            small_tap_targets: targets.length,
            horizontal_overflow: document.documentElement.scrollWidth > window.innerWidth + 1,
            base_font_size_px: Number.isFinite(size) ? size : null
        };
    })()
"#;
