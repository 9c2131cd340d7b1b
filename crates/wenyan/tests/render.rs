#![cfg(test)]

use std::error::Error;

use css::{HlTheme, HlThemeRegistry, InlineCss, LoaderCss, Theme, ThemeMeta, ThemeRegistry};
use futures::FutureExt as _;
use futures::future;
use html::{DOM, NodeId, parse_fragment};
use wenyan::{ApplyStylesOptions, MONOSPACE, ResolvedStyles, SANS_SERIF, WenyanCore, WenyanOptions};

const DEFAULT_THEME: &str = ":root { --accent: #35b378; }\n\
    #wenyan { line-height: 1.75; }\n\
    #wenyan pre { border-radius: 5px; }\n\
    #wenyan pre code { display: block; }\n\
    #wenyan h2 { color: var(--accent); }\n\
    #wenyan h2::after { content: \"~\"; }\n\
    #wenyan a { color: var(--accent); }";

const SERIF_THEME: &str = "#wenyan { font-family: Georgia, serif; }\n\
    #wenyan pre { font-size: 14px; }";

const SOLARIZED: &str = ".hljs-keyword { color: #859900; }";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registries() -> (ThemeRegistry, HlThemeRegistry) {
    let mut themes = ThemeRegistry::new();
    themes.register(Theme::new(
        ThemeMeta::new("default", "Default"),
        InlineCss::new(DEFAULT_THEME),
    ));
    themes.register(Theme::new(
        ThemeMeta::new("phycat", "Phycat"),
        LoaderCss::new(|| future::ready(anyhow::Ok(SERIF_THEME.to_owned())).boxed()),
    ));
    let mut hl_themes = HlThemeRegistry::new();
    hl_themes.register(HlTheme::new("solarized-light", InlineCss::new(SOLARIZED)));
    (themes, hl_themes)
}

fn core(is_wechat: bool) -> WenyanCore {
    let (themes, hl_themes) = registries();
    WenyanCore::new(WenyanOptions { is_wechat }, themes, hl_themes)
}

fn content(html: &str) -> Result<(DOM, NodeId), Box<dyn Error>> {
    let dom = parse_fragment(html)?;
    let root = dom
        .get_element_by_id(dom.root(), "wenyan")
        .ok_or("missing content root")?;
    Ok((dom, root))
}

const ARTICLE: &str = "<section id=\"wenyan\">\
    <h2>Intro</h2>\
    <p>See <a href=\"https://example.com\">the site</a>.</p>\
    <pre><code class=\"hljs\"><span class=\"hljs-keyword\">let</span> x = 1;\nx</code></pre>\
    <ul><li>one</li></ul>\
    </section>";

#[tokio::test]
async fn default_theme_end_to_end() -> Result<(), Box<dyn Error>> {
    init_logging();
    let core = core(true);
    let (mut dom, root) = content(ARTICLE)?;
    let html = core
        .apply_styles_with_theme(&mut dom, root, ApplyStylesOptions::default())
        .await?;

    let root_style = dom.get_attribute(root, "style").ok_or("root not styled")?;
    assert_eq!(
        root_style,
        format!("font-family: {SANS_SERIF}; line-height: 1.75;")
    );
    assert_eq!(dom.get_attribute(root, "data-provider"), Some("WenYan"));

    let heading = dom.query_selector(root, "h2")?.ok_or("missing h2")?;
    assert_eq!(dom.get_attribute(heading, "style"), Some("color: #35b378;"));
    assert_eq!(dom.text_content(heading), "Intro~");

    let code = dom.query_selector(root, "pre code")?.ok_or("missing code")?;
    assert_eq!(
        dom.get_attribute(code, "style"),
        Some(format!("font-family: {MONOSPACE}; display: block;").as_str())
    );
    let pre = dom.query_selector(root, "pre")?.ok_or("missing pre")?;
    let pre_style = dom.get_attribute(pre, "style").ok_or("pre not styled")?;
    assert!(pre_style.starts_with("font-size: 12px; border-radius: 5px;"));
    let keyword = dom
        .query_selector(root, ".hljs-keyword")?
        .ok_or("missing keyword")?;
    assert_eq!(dom.get_attribute(keyword, "style"), Some("color: #859900;"));

    assert!(html.starts_with("<section id=\"wenyan\""));
    assert!(html.contains("<sup class=\"footnote\">[1]</sup>"));
    assert!(html.contains("<h3>引用链接</h3>"));
    assert!(html.contains("the site: <i>https://example.com</i>"));
    assert!(html.contains("&nbsp;x&nbsp;=&nbsp;1;<br>x"));
    assert!(html.contains("<li><section>one</section></li>"));
    Ok(())
}

#[tokio::test]
async fn theme_fonts_are_kept() -> Result<(), Box<dyn Error>> {
    let core = core(false);
    let (mut dom, root) = content(ARTICLE)?;
    let options = ApplyStylesOptions {
        theme_id: "PHYCAT".to_owned(),
        is_mac_style: false,
        is_add_footnote: false,
        ..ApplyStylesOptions::default()
    };
    let html = core.apply_styles_with_theme(&mut dom, root, options).await?;
    assert_eq!(
        dom.get_attribute(root, "style"),
        Some("font-family: Georgia, serif;")
    );
    let pre = dom.query_selector(root, "pre")?.ok_or("missing pre")?;
    assert_eq!(dom.get_attribute(pre, "style"), Some("font-size: 14px;"));
    assert!(!html.contains("data-provider"));
    assert!(!html.contains("footnote"));
    assert!(html.contains("x = 1;\nx"));
    Ok(())
}

#[tokio::test]
async fn direct_css_overrides_registry() -> Result<(), Box<dyn Error>> {
    let core = core(false);
    let options = ApplyStylesOptions {
        theme_id: "missing".to_owned(),
        theme_css: Some(":root{--c:red;} #wenyan p { color: var(--c); }".to_owned()),
        hl_theme_css: Some(String::new()),
        is_mac_style: false,
        ..ApplyStylesOptions::default()
    };
    let html = core
        .render_fragment("<div id=\"wenyan\"><p>x</p></div>", options)
        .await?;
    assert_eq!(html, "<div id=\"wenyan\"><p style=\"color: red;\">x</p></div>");
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_reported() -> Result<(), Box<dyn Error>> {
    let core = core(true);
    let missing_theme = core
        .render_fragment(
            "<div id=\"wenyan\"></div>",
            ApplyStylesOptions {
                theme_id: "nope".to_owned(),
                ..ApplyStylesOptions::default()
            },
        )
        .await;
    assert_eq!(
        missing_theme.map_err(|err| err.to_string()),
        Err("theme not found: nope".to_owned())
    );

    let missing_hl = core
        .render_fragment(
            "<div id=\"wenyan\"></div>",
            ApplyStylesOptions {
                hl_theme_id: "monokai".to_owned(),
                ..ApplyStylesOptions::default()
            },
        )
        .await;
    assert_eq!(
        missing_hl.map_err(|err| err.to_string()),
        Err("highlight theme not found: monokai".to_owned())
    );

    let no_root = core
        .render_fragment("<div>no root</div>", ApplyStylesOptions::default())
        .await;
    assert!(no_root.is_err_and(|err| err.to_string().contains("#wenyan")));
    Ok(())
}

#[test]
fn resolved_css_runs_wechat_rewrites() -> Result<(), Box<dyn Error>> {
    init_logging();
    let core = core(true);
    let (mut dom, root) = content(
        "<section id=\"wenyan\"><section class=\"block-equation\">\
         <mjx-container><svg width=\"3ex\"><path class=\"mjx-solid\"></path></svg></mjx-container>\
         </section></section>",
    )?;
    let html = core.apply_styles_with_resolved_css(
        &mut dom,
        root,
        ResolvedStyles {
            is_mac_style: false,
            ..ResolvedStyles::default()
        },
    )?;
    assert_eq!(
        html,
        "<section id=\"wenyan\" data-provider=\"WenYan\">\
         <section class=\"block-equation\" style=\"text-align: center; margin-bottom: 1rem;\">\
         <svg style=\"width: 3ex;\"><path fill=\"none\" stroke-width=\"70\"></path></svg>\
         </section></section>"
    );
    Ok(())
}

#[test]
fn options_load_from_json() -> Result<(), Box<dyn Error>> {
    let options: ApplyStylesOptions = serde_json::from_str(
        r#"{"themeId":"phycat","hlThemeCss":".x{color:red}","isAddFootnote":false}"#,
    )?;
    assert_eq!(
        options,
        ApplyStylesOptions {
            theme_id: "phycat".to_owned(),
            hl_theme_css: Some(".x{color:red}".to_owned()),
            is_add_footnote: false,
            ..ApplyStylesOptions::default()
        }
    );
    let core_options: WenyanOptions = serde_json::from_str(r#"{"isWechat":false}"#)?;
    assert!(!core_options.is_wechat);
    Ok(())
}
