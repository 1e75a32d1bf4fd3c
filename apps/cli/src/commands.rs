//! Subcommand implementations.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use mediashare_client::{FeedPager, RemoteMediaService};
use mediashare_protocol::{Post, PostId, Principal, UserProfile};
use mediashare_transfer::{ChunkSource, FileSource};
use mediashare_uploader::{UploadCoordinator, UploadEvent};

use crate::config::ClientConfig;

/// Exit status for an upload interrupted with Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

pub async fn upload(
    service: Arc<RemoteMediaService>,
    config: &ClientConfig,
    file: &Path,
) -> anyhow::Result<ExitCode> {
    let source =
        FileSource::open(file).with_context(|| format!("cannot open {}", file.display()))?;
    let total_bytes = source.total_len();

    let coordinator = UploadCoordinator::new(service.clone(), config.upload_config())
        .with_cache(service.cache().clone());

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
        )?
        .progress_chars("#>-"),
    );
    bar.set_message(format!("{} ({total_bytes} bytes)", file.display()));

    let mut progress = coordinator.subscribe_progress();
    let progress_task = tokio::spawn({
        let bar = bar.clone();
        async move {
            while progress.changed().await.is_ok() {
                let percent = *progress.borrow_and_update();
                bar.set_position(u64::from(percent));
            }
        }
    });

    let events_task = coordinator.take_events().map(|mut events| {
        let bar = bar.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let UploadEvent::Retrying {
                    chunk_index,
                    attempt,
                    ..
                } = event
                {
                    bar.set_message(format!("retrying chunk {chunk_index} (attempt {attempt})"));
                }
            }
        })
    });

    let cancel = CancellationToken::new();
    let ctrl_c_task = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("interrupt received, cancelling upload");
                cancel.cancel();
            }
        }
    });

    let result = coordinator.upload_with_cancel(source, cancel).await;

    ctrl_c_task.abort();
    progress_task.abort();
    if let Some(task) = events_task {
        task.abort();
    }

    match result {
        Ok(receipt) => {
            bar.finish_with_message("done");
            println!(
                "Uploaded post {} ({} bytes in {} chunks)",
                receipt.post_id, receipt.total_bytes, receipt.chunks
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_cancelled() => {
            bar.abandon_with_message("cancelled");
            eprintln!("Upload cancelled");
            Ok(ExitCode::from(EXIT_CANCELLED))
        }
        Err(e) => {
            bar.abandon_with_message("failed");
            Err(e).with_context(|| format!("upload of {} failed", file.display()))
        }
    }
}

pub async fn feed(
    service: Arc<RemoteMediaService>,
    page_size: u64,
    start_page: u64,
    all: bool,
) -> anyhow::Result<ExitCode> {
    let mut pager = FeedPager::new(service, page_size);
    let mut shown = false;

    while let Some(posts) = pager.next_page().await? {
        let index = pager.page_index();
        if index < start_page {
            continue;
        }
        println!("-- page {index} --");
        for post in &posts {
            print_post_line(post);
        }
        shown = true;
        if !all {
            break;
        }
    }

    if !shown {
        println!("No posts.");
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn show(
    service: &RemoteMediaService,
    post_id: PostId,
    output: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let post = service.get_post(post_id).await?;

    println!("Post:      {}", post.id);
    println!("Author:    {}", post.author);
    println!("Size:      {} bytes", post.media.len());
    println!("Finalized: {}", post.is_finalized);

    if let Some(path) = output {
        std::fs::write(path, &post.media)
            .with_context(|| format!("cannot write {}", path.display()))?;
        println!("Media written to {}", path.display());
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn posts_by_author(
    service: &RemoteMediaService,
    author: &str,
) -> anyhow::Result<ExitCode> {
    let posts = service
        .get_posts_by_author(&Principal::new(author))
        .await?;
    if posts.is_empty() {
        println!("No posts by {author}.");
    }
    for post in &posts {
        print_post_line(post);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn delete(service: &RemoteMediaService, post_id: PostId) -> anyhow::Result<ExitCode> {
    if service.delete_post(post_id).await? {
        println!("Deleted post {post_id}");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("Post {post_id} was not deleted");
        Ok(ExitCode::FAILURE)
    }
}

pub async fn whoami(service: &RemoteMediaService) -> anyhow::Result<ExitCode> {
    let role = service.get_caller_user_role().await?;
    let admin = service.is_caller_admin().await?;
    let profile = service.get_caller_user_profile().await?;

    println!("Role:    {role}{}", if admin { " (admin)" } else { "" });
    match profile {
        Some(p) => println!("Name:    {}", p.name),
        None => println!("Name:    (no profile saved)"),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn show_profile(
    service: &RemoteMediaService,
    user: Option<&str>,
) -> anyhow::Result<ExitCode> {
    let profile = match user {
        Some(user) => service.get_user_profile(&Principal::new(user)).await?,
        None => service.get_caller_user_profile().await?,
    };
    match profile {
        Some(p) => println!("{}", p.name),
        None => println!("(no profile)"),
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn set_profile(service: &RemoteMediaService, name: String) -> anyhow::Result<ExitCode> {
    anyhow::ensure!(!name.trim().is_empty(), "name must not be empty");
    service
        .save_caller_user_profile(&UserProfile { name })
        .await?;
    println!("Profile saved");
    Ok(ExitCode::SUCCESS)
}

fn print_post_line(post: &Post) {
    let state = if post.is_finalized { "" } else { " (pending)" };
    println!(
        "{:>20}  {:<24}  {:>10} bytes{state}",
        post.id,
        post.author.as_str(),
        post.media.len()
    );
}
