use anyhow::Context;
use clap::Parser;
use sku_image_common::match_products;
use sku_image_linker::{auth, catalog, cli, config, export, publish, source};
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "sku_linker=debug,sku_image_linker=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();
    let mut config = Config::load(config_path).context("設定の読み込みに失敗しました")?;

    match cli.command {
        Commands::Run { source: source_args, catalog: catalog_path, output, download, match_mode, link_column } => {
            println!("🔗 sku-linker - 画像リンク生成\n");

            source_args.apply(&mut config);
            if let Some(path) = catalog_path {
                config.catalog_path = path;
            }
            if output.is_some() {
                config.output_csv = output;
            }
            if link_column.is_some() {
                config.link_column = link_column;
            }
            if download {
                config.publish.enabled = true;
            }
            config.validate_publish()?;

            let steps = if config.publish.enabled { 5 } else { 4 };

            // 1. カタログ読み込み
            println!("[1/{}] 商品カタログを読み込み中...", steps);
            let products = catalog::load_products(&config.catalog_path, &config.record_element)?;
            println!("✔ {}件の商品を読み込み\n", products.len());

            // 2. 画像列挙
            println!("[2/{}] 画像を列挙中... ({})", steps, source_args.source);
            let authenticator = auth::authenticator_from_config(&config);
            let resource_source =
                source::open_source(source_args.source, &config, authenticator.as_ref()).await?;
            let resources = resource_source.enumerate().await?;
            println!("✔ {}件の画像を検出\n", resources.len());

            // 3. 照合
            println!("[3/{}] SKU/EANを照合中... (モード: {})", steps, match_mode);
            let mut rows = match_products(&products, &resources, match_mode);
            for row in &rows {
                tracing::debug!(sku = %row.sku, ean = %row.ean, link = %row.link, "matched");
            }
            println!("✔ {}/{}件が一致\n", rows.len(), products.len());

            // 4. 画像保存（任意）
            if config.publish.enabled {
                println!("[4/{}] 画像を保存中...", steps);
                let publisher = publish::Publisher::new(
                    publish::HttpFetcher::new(),
                    config.publish.download_folder.clone(),
                    publish::HostingTemplate::from(&config.publish),
                );
                let outcomes = publisher.publish_all(&rows).await?;
                // 失敗の詳細は publish_all が1件ずつ warn で出す
                let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
                println!(
                    "✔ {}件を保存: {} (失敗 {}件)\n",
                    outcomes.len() - failed,
                    publisher.folder().display(),
                    failed
                );
                rows = outcomes.into_iter().map(|o| o.record).collect();
            }

            // 5. CSV出力
            let output_path = config.output_path();
            println!("[{}/{}] CSVを出力中...", steps, steps);
            export::write_csv(&rows, &output_path, &config.link_column())?;
            println!("✔ CSV出力: {}", output_path.display());

            println!("\n✅ 完了");
        }

        Commands::List { source: source_args, json } => {
            source_args.apply(&mut config);

            let authenticator = auth::authenticator_from_config(&config);
            let resource_source =
                source::open_source(source_args.source, &config, authenticator.as_ref()).await?;
            let resources = resource_source.enumerate().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&resources)?);
            } else {
                for entry in &resources {
                    match &entry.parent {
                        Some(parent) => println!("{}\t{}\t{}", entry.label, entry.url, parent),
                        None => println!("{}\t{}", entry.label, entry.url),
                    }
                }
                eprintln!("{}件 ({})", resources.len(), resource_source.name());
            }
        }

        Commands::Config { show, add_folder, set_sitemap_url, set_hosting, branch, credentials } => {
            let mut changed = false;

            for folder in add_folder {
                if !config.drive.folder_ids.contains(&folder) {
                    config.drive.folder_ids.push(folder);
                    changed = true;
                }
            }
            if let Some(url) = set_sitemap_url {
                config.sitemap_url = Some(url);
                changed = true;
            }
            if let Some(hosting) = set_hosting {
                let (username, repository) =
                    cli::parse_hosting(&hosting).map_err(anyhow::Error::msg)?;
                config.publish.username = username;
                config.publish.repository = repository;
                changed = true;
            }
            if let Some(branch) = branch {
                config.publish.branch = branch;
                changed = true;
            }
            if let Some(path) = credentials {
                config.drive.credentials_file = path;
                changed = true;
            }

            if changed {
                let saved = config.save(config_path)?;
                println!("✔ 設定を保存しました: {}", saved.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  カタログ: {}", config.catalog_path.display());
                println!("  出力CSV: {}", config.output_path().display());
                println!("  Drive フォルダ: {}", config.drive.folder_ids.join(", "));
                println!("  クライアントシークレット: {}", config.drive.credentials_file.display());
                println!("  サイトマップ: {}", config.sitemap_url.as_deref().unwrap_or("未設定"));
                println!(
                    "  公開先: {}/{} ({})",
                    config.publish.username, config.publish.repository, config.publish.branch
                );
                println!(
                    "  アクセストークン: {}",
                    if config.drive_token().is_some() { "設定済み" } else { "未設定" }
                );
            }
        }
    }

    Ok(())
}
