use color_eyre::{eyre::eyre, Result};
use formul8::config::default_config_path;
use formul8::{BindOptions, Binder, Document, Element, NodeId};
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    setup()?;

    let options = load_options().await;
    let debounce = options.debounce_duration();

    let (document, form) = build_login_form()?;
    let binder = Binder::new(document.clone());
    let session = binder
        .bind(form, Some(options))
        .map_err(|e| eyre!("Failed to bind login form: {}", e))?;
    info!("Listening for \"{}\"", session.event_name());

    let mut changes = document.subscribe(session.event_name());
    let printer = tokio::spawn(async move {
        while let Some(event) = changes.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!("{}", json),
                Err(e) => warn!("Unable to serialize change event: {}", e),
            }
        }
    });

    // a user filling in the form
    let user = field(&document, form, "user")?;
    for prefix in ["a", "al", "ali", "alic", "alice"] {
        document.user_input(user, prefix)?;
    }
    let remember = field(&document, form, "remember")?;
    document.toggle(remember)?;
    tokio::time::sleep(debounce + Duration::from_millis(50)).await;

    // the application writing back
    let values = session.values();
    if values.is_writable() {
        values.set_path("address.city", "Graz")?;
        values.set_path("address.zip", 8010)?;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    let released = session.teardown();
    info!(
        "Final state: {}",
        serde_json::to_string_pretty(&released.snapshot())?
    );
    printer.abort();
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

/// Options from `<config dir>/formul8/options.toml`, defaults otherwise.
async fn load_options() -> BindOptions {
    let Some(path) = default_config_path() else {
        return BindOptions::default();
    };
    if !path.exists() {
        info!("No options file at {}, using defaults", path.display());
        return BindOptions::default();
    }
    match BindOptions::load(&path).await {
        Ok(options) => {
            info!("Loaded bind options from {}", path.display());
            options
        }
        Err(e) => {
            warn!("Ignoring {}: {}", path.display(), e);
            BindOptions::default()
        }
    }
}

fn build_login_form() -> Result<(Document, NodeId)> {
    let doc = Document::new();
    let body = doc.append(doc.root(), Element::container("body"))?;
    let form = doc.append(body, Element::form().with_id("login"))?;
    doc.append(form, Element::input("text").with_name("user"))?;
    doc.append(form, Element::input("checkbox").with_name("remember"))?;

    let address = doc.append(form, Element::fieldset())?;
    doc.append(address, Element::legend("Address"))?;
    doc.append(address, Element::input("text").with_name("city"))?;
    doc.append(address, Element::input("number").with_name("zip"))?;
    Ok((doc, form))
}

fn field(document: &Document, form: NodeId, name: &str) -> Result<NodeId> {
    document
        .children(form)
        .into_iter()
        .find(|&child| document.name(child).as_deref() == Some(name))
        .ok_or_else(|| eyre!("No field \"{}\" in form", name))
}
