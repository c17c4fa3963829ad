use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use howdyhire::bootstrap::{BootstrapOutcome, PageBootstrap};
use howdyhire::classify::{ClassifyClient, PageIds, HIDDEN_CLASS};
use howdyhire::config::Config;
use howdyhire::dom::{Document, HeadlessPage, NewElement, Selector};

const VIEWPORT_HEIGHT: f64 = 800.0;
const SCROLL_STEP: f64 = 400.0;
const SCROLL_PAUSE: Duration = Duration::from_millis(250);
const FEATURE_CARDS: usize = 6;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting HowdyHire page driver v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [job_role, description_path, resume_path] = args.as_slice() else {
        bail!("usage: howdyhire <job-role> <job-description-file> <resume-file>");
    };
    let job_description = tokio::fs::read_to_string(description_path)
        .await
        .with_context(|| format!("Could not read job description from {description_path}"))?;
    let resume_text = tokio::fs::read_to_string(resume_path)
        .await
        .with_context(|| format!("Could not read resume from {resume_path}"))?;

    let options = config.bootstrap_options();
    let ids = options.ids.clone();
    let page = build_page(&options.ids, job_role, &job_description, &resume_text);

    let client = ClassifyClient::new(&config.classify_base_url, config.classify_timeout)?;
    info!("Classification endpoint: {}", client.endpoint());

    let bootstrap = PageBootstrap::new(options);
    let shared = Arc::new(page.clone());
    let mut session = match bootstrap.install(shared.clone(), shared, Arc::new(client)) {
        BootstrapOutcome::Installed(session) => session,
        BootstrapOutcome::AlreadyInitialized => bail!("page behaviors were already initialized"),
    };

    let outcome = session.on_load().await;
    info!("Reveal setup: {outcome:?}");

    // Scroll to the bottom and back so every card gets a chance to reveal
    let bottom = (page.content_height() - page.viewport_height()).max(0.0);
    let mut y = 0.0;
    while y < bottom {
        y = (y + SCROLL_STEP).min(bottom);
        page.scroll_to(y);
        tokio::time::sleep(SCROLL_PAUSE).await;
    }
    page.scroll_to(0.0);
    tokio::time::sleep(SCROLL_PAUSE).await;

    let visible = page.query_all(&Selector::class("visible")).len();
    info!("{visible} of {FEATURE_CARDS} cards revealed");

    let state = session.submit().await;
    info!("Submission finished: {state:?}");

    print_results(&page, &ids);
    session.teardown();

    Ok(())
}

/// Landing page with a column of feature cards followed by the classify form.
fn build_page(ids: &PageIds, job_role: &str, job_description: &str, resume_text: &str) -> HeadlessPage {
    let page = HeadlessPage::new(VIEWPORT_HEIGHT);

    page.append(NewElement::new("header").id("hero").layout(0.0, 700.0));

    for index in 0..FEATURE_CARDS {
        let top = 800.0 + index as f64 * 450.0;
        page.append(
            NewElement::new("section")
                .class("reveal-card")
                .attr("data-reveal", "")
                .layout(top, 320.0),
        );
    }

    let form_top = 800.0 + FEATURE_CARDS as f64 * 450.0;
    let form = page.append(NewElement::new("form").id(&ids.form).layout(form_top, 600.0));
    for (id, value) in [
        (&ids.job_role, job_role),
        (&ids.job_description, job_description),
        (&ids.resume_text, resume_text),
    ] {
        // The form was just appended, so appending children cannot fail.
        let _ = page.append_child(form, NewElement::new("textarea").id(id).value(value));
    }

    page.append(NewElement::new("div").id(&ids.placeholder).text("Results will appear here."));
    let container = page.append(
        NewElement::new("div")
            .id(&ids.container)
            .class(HIDDEN_CLASS)
            .layout(form_top + 600.0, 600.0),
    );
    for id in [
        &ids.role,
        &ids.badge,
        &ids.confidence,
        &ids.gen_ai,
        &ids.jd_comparison,
        &ids.analysis,
        &ids.suggestions,
    ] {
        let _ = page.append_child(container, NewElement::new("div").id(id));
    }

    page
}

fn print_results(page: &HeadlessPage, ids: &PageIds) {
    let text = |id: &str| {
        page.element_by_id(id)
            .and_then(|node| page.text(node))
            .unwrap_or_default()
    };

    println!("Role:        {}", text(&ids.role));
    println!("Verdict:     {}", text(&ids.badge));
    println!("{}", text(&ids.confidence));
    println!("Assessment:  {}", text(&ids.gen_ai));
    println!("JD match:    {}", text(&ids.jd_comparison));
    println!("Analysis:    {}", text(&ids.analysis));
    println!("Suggestions: {}", text(&ids.suggestions));
}
