use anyhow::{bail, Context, Result};
use photo_cursor_lib::{Carousel, Catalog, CatalogConfig, Viewport};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage: photo-cursor [--config <path>] <folders | items <folder> [page] | favorites | rotate <key>>";

fn load_config(path: Option<PathBuf>) -> Result<CatalogConfig> {
    let path = path.or_else(|| std::env::var_os("PHOTO_CURSOR_CONFIG").map(PathBuf::from));
    match path {
        Some(path) => CatalogConfig::load(&path),
        None => CatalogConfig::from_env(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path = None;
    if let Some(idx) = args.iter().position(|arg| arg == "--config") {
        if idx + 1 >= args.len() {
            bail!("--config needs a path\n{}", USAGE);
        }
        config_path = Some(PathBuf::from(args.remove(idx + 1)));
        args.remove(idx);
    }

    let config = load_config(config_path)?;
    let catalog = Catalog::from_config(&config).await?;

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["folders"] => {
            // A failed listing degrades to an empty home page
            let folders = catalog.folders().await.unwrap_or_else(|err| {
                log::error!("[Catalog] Failed to list folders: {}", err);
                Vec::new()
            });
            for folder in folders {
                println!("{}\t{}\t{}", folder.name, folder.label(), folder.thumbnail_url);
            }
        }
        ["items", folder, rest @ ..] => {
            let page = match rest {
                [] => 1,
                [page] => page
                    .parse()
                    .with_context(|| format!("Invalid page number: {}", page))?,
                _ => bail!(USAGE),
            };
            let items = catalog.folder_items(folder).await.unwrap_or_else(|err| {
                log::error!("[Catalog] Failed to list {}: {}", folder, err);
                Vec::new()
            });

            let mut carousel = Carousel::new(items.len(), Viewport::Wide.page_size());
            carousel.change_page(page);
            println!(
                "{} ({} items, page {}/{})",
                catalog.display_name(folder),
                carousel.len(),
                carousel.page(),
                carousel.total_pages()
            );
            for decorated in catalog.decorate(carousel.page_window(&items)) {
                let mut flags = String::new();
                if decorated.favorite {
                    flags.push('*');
                }
                if decorated.is_cover {
                    flags.push('#');
                }
                println!(
                    "{}\t{}\t{}\t{}",
                    decorated.item.key, flags, decorated.rotation, decorated.item.url
                );
            }
        }
        ["favorites"] => {
            for item in catalog.favorites_as_items() {
                println!("{}\t{}", item.key, item.url);
            }
        }
        ["rotate", key] => {
            let angle = catalog.rotate(key)?;
            println!("{}\t{}", key, angle);
        }
        _ => bail!(USAGE),
    }

    Ok(())
}
