//! `mmp tree`: walk the asset library through the lazy tree cache.

use std::collections::HashSet;
use std::sync::Arc;

use owo_colors::OwoColorize;
use serde::Serialize;
use tokio_util::sync::{CancellationToken, DropGuard};

use mmp_core::{
    AssetSource, AssetTree, CoreError, ErrorReporter, NodeIcon, ROOT_ID, ToastLimits, Toaster,
};

use super::Context;
use crate::cli::{GlobalOpts, TreeArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct Row {
    id: String,
    depth: usize,
    name: String,
    icon: String,
    #[serde(skip)]
    glyph: &'static str,
    is_folder: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    selected: bool,
}

fn glyph(icon: NodeIcon) -> &'static str {
    match icon {
        NodeIcon::Bundle => "▣",
        NodeIcon::FolderOpen => "▾",
        NodeIcon::Folder => "▸",
        NodeIcon::Image => "◩",
        NodeIcon::Model => "◆",
        NodeIcon::Code => "≡",
        NodeIcon::File => "·",
    }
}

/// Depth-first listing below the root.
///
/// A folder is opened when it sits above `depth` or has been expanded
/// (for instance by a reveal).
async fn walk<S: AssetSource>(
    tree: &AssetTree<S>,
    depth: usize,
    selected: Option<&str>,
) -> Result<Vec<Row>, CoreError> {
    let mut rows = Vec::new();
    let mut opened = HashSet::new();
    let mut stack: Vec<(String, usize)> = Vec::new();

    push_children(&mut stack, &tree.get_children(ROOT_ID).await?, 0);

    while let Some((id, level)) = stack.pop() {
        let node = tree.get_item(&id);
        let open = node.is_folder
            && (level + 1 < depth || tree.is_expanded(&id))
            && opened.insert(id.clone());
        let icon = node.icon(open);
        rows.push(Row {
            selected: selected == Some(id.as_str()),
            id: id.clone(),
            depth: level,
            name: node.name,
            icon: icon.to_string(),
            glyph: glyph(icon),
            is_folder: node.is_folder,
            kind: node.kind,
        });
        if open {
            push_children(&mut stack, &tree.get_children(&id).await?, level + 1);
        }
    }
    Ok(rows)
}

fn push_children(stack: &mut Vec<(String, usize)>, ids: &[String], level: usize) {
    stack.extend(ids.iter().rev().map(|id| (id.clone(), level)));
}

fn plain(rows: &[Row], color: bool) -> String {
    rows.iter()
        .map(|row| {
            let name = if row.selected && color {
                row.name.bold().to_string()
            } else {
                row.name.clone()
            };
            format!(
                "{}{} {}  {}",
                "  ".repeat(row.depth),
                row.glyph,
                name,
                output::dim(&row.id, color)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Log and toast `err`, then turn it into a CLI error.
fn surface(reporter: &ErrorReporter, err: CoreError) -> CliError {
    let config = reporter.report(&err);
    match err {
        CoreError::Api { status, .. } => CliError::Api {
            status,
            title: config.title,
            description: config.description,
        },
        other => other.into(),
    }
}

/// Reporter whose toast cache is swept until the guard drops.
fn reporter(limits: ToastLimits) -> (ErrorReporter, DropGuard) {
    let reporter = ErrorReporter::new(Arc::new(Toaster::new(limits)));
    let cancel = CancellationToken::new();
    drop(reporter.toaster().spawn_sweeper(cancel.clone()));
    (reporter, cancel.drop_guard())
}

pub async fn handle(args: TreeArgs, ctx: &Context, global: &GlobalOpts) -> Result<(), CliError> {
    let tree = AssetTree::with_config(ctx.backend.api_client()?, ctx.tree);
    let (reporter, _sweeping) = reporter(ctx.toasts);

    if let Some(ref target) = args.reveal {
        let opened = tree.reveal(target).await.map_err(|e| surface(&reporter, e))?;
        tracing::debug!(target_id = %target, ancestors = opened.len(), "revealed asset");
    }

    let rows = walk(&tree, args.depth, args.reveal.as_deref())
        .await
        .map_err(|e| surface(&reporter, e))?;

    let rendered = output::render_single(global.output, rows.as_slice(), |r| plain(r, ctx.color))?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
