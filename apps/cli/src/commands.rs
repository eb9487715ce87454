use folio_site::{
    CONFIG_FILE_NAME, CollectionDefinition, CollectionLoader, FieldType, FolioError, ImageOptions,
    Integration, SiteConfig, SiteContent, lookup, registry,
};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::fs;
use std::path::Path;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};

const DEBOUNCE_DURATION: Duration = Duration::from_millis(300);

const DEFAULT_CONFIG: &str = r#"site = "http://localhost:4321"
trailing_slash = "ignore"
integrations = ["mdx"]
"#;

pub fn init_site(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = root.join(CONFIG_FILE_NAME);

    if config_path.exists() {
        return Err(format!("{} already exists in {}", CONFIG_FILE_NAME, root.display()).into());
    }

    fs::create_dir_all(root)?;
    fs::write(&config_path, DEFAULT_CONFIG)?;

    for definition in registry() {
        fs::create_dir_all(definition.source.base_dir(root))?;
    }
    fs::create_dir_all(ImageOptions::for_root(root).source_dir)?;

    println!("Initialized folio site in {}", root.display());

    Ok(())
}

pub fn check_site(root: &Path) -> Result<SiteContent, Box<dyn std::error::Error>> {
    let start = Instant::now();

    let config = SiteConfig::load(root)?;
    let content = CollectionLoader::new(root).load_site_content()?;

    if missing_mdx_integration(&config, &content) {
        tracing::warn!("blog posts are .mdx files but the mdx integration is not enabled");
    }

    println!(
        "Validated {} blog posts, {} projects, {} work entries for {} in {:.2?}",
        content.blog.len(),
        content.projects.len(),
        content.work.len(),
        config.site,
        start.elapsed()
    );

    Ok(content)
}

fn missing_mdx_integration(config: &SiteConfig, content: &SiteContent) -> bool {
    let has_mdx_posts = content.blog.entries.iter().any(|entry| {
        entry
            .path
            .extension()
            .is_some_and(|extension| extension.eq_ignore_ascii_case("mdx"))
    });
    has_mdx_posts && !config.has_integration(Integration::Mdx)
}

pub fn watch_site(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(error) = check_site(root) {
        eprintln!("Error: {error}");
    }

    let (notify_tx, notify_rx) = channel();

    let mut watcher = RecommendedWatcher::new(
        notify_tx,
        Config::default().with_poll_interval(Duration::from_millis(200)),
    )?;

    for definition in registry() {
        let base_dir = definition.source.base_dir(root);
        if base_dir.exists() {
            watcher.watch(&base_dir, RecursiveMode::Recursive)?;
        }
    }

    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    }

    println!("Watching for changes, press Ctrl+C to stop");

    loop {
        match notify_rx.recv() {
            Ok(_event) => {
                loop {
                    match notify_rx.recv_timeout(DEBOUNCE_DURATION) {
                        Ok(_) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return Ok(()),
                    }
                }

                println!("Changes detected, revalidating...");

                if let Err(error) = check_site(root) {
                    eprintln!("Error: {error}");
                }
            }
            Err(error) => {
                eprintln!("Watch error: {error}");
                return Ok(());
            }
        }
    }
}

pub fn export_content(root: &Path, output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    SiteConfig::load(root)?;
    let content = CollectionLoader::new(root).load_site_content()?;
    let json = serde_json::to_string_pretty(&content)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)?;
            tracing::info!("wrote content to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}

pub fn print_schema(collection: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let definitions: Vec<&CollectionDefinition> = match collection {
        Some(name) => vec![lookup(name).ok_or_else(|| FolioError::UnknownCollection {
            name: name.to_string(),
        })?],
        None => registry().iter().collect(),
    };

    for definition in definitions {
        print!("{}", describe_collection(definition));
    }

    Ok(())
}

fn describe_collection(definition: &CollectionDefinition) -> String {
    let mut output = format!("{} ({})\n", definition.name, definition.source);
    for field in definition.schema.fields {
        let requirement = if field.required { "required" } else { "optional" };
        output.push_str(&format!(
            "  {}: {} ({})\n",
            field.name,
            describe_type(field.field_type),
            requirement
        ));
    }
    output
}

fn describe_type(field_type: FieldType) -> String {
    match field_type {
        FieldType::List(element) => format!("list of {}", describe_type(*element)),
        other => other.name().to_string(),
    }
}

pub fn optimize_images(root: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let options = ImageOptions::for_root(root);
    let report = folio_site::optimize_images(&options)?;

    tracing::info!(
        count = report.converted.len(),
        bytes = report.total_bytes(),
        "image optimization finished"
    );
    println!("Images optimized");

    Ok(())
}
