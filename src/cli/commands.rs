//! Command dispatch
//!
//! Every invocation loads the forest file into a `MemoryStore`, runs one
//! command against the services and writes the file back if the command
//! mutated the forest.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use clap::CommandFactory;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, PositionArgs, TreeArg};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::Settings;
use crate::domain::{DomainError, NodeId, Payload, TreeId, Value};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::{ForestFile, InfraError};

/// Where an insert or move lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Before(NodeId),
    After(NodeId),
    Child { parent: NodeId, index: Option<i64> },
}

impl TryFrom<&PositionArgs> for Position {
    type Error = CliError;

    fn try_from(args: &PositionArgs) -> Result<Self, Self::Error> {
        match (args.before, args.after, args.parent) {
            (Some(id), None, None) => Ok(Position::Before(NodeId(id))),
            (None, Some(id), None) => Ok(Position::After(NodeId(id))),
            (None, None, Some(id)) => Ok(Position::Child {
                parent: NodeId(id),
                index: args.index,
            }),
            _ => Err(CliError::InvalidArgs(
                "give exactly one of --before, --after or --parent".into(),
            )),
        }
    }
}

/// Parse `KEY=VALUE` assignments into a payload.
pub fn parse_assignments(items: &[String]) -> CliResult<Payload> {
    items
        .iter()
        .map(|item| match item.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), Value::parse_literal(value))),
            _ => Err(CliError::InvalidArgs(format!("expected KEY=VALUE, got '{}'", item))),
        })
        .collect()
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| InfraError::io("resolve current directory", e))?,
    };
    let mut settings = Settings::load(Some(&dir))?;
    if let Some(file) = &cli.file {
        settings.forest_file = file.clone();
    }
    Ok(settings)
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    if let Commands::Completion { shell } = &cli.command {
        return _completion(*shell);
    }
    let settings = load_settings(cli)?;
    if let Commands::Config = &cli.command {
        output::info(&settings.to_toml()?);
        return Ok(());
    }

    let file = ForestFile::new(settings.forest_file.clone());
    let store = Arc::new(file.load()?);
    let container = ServiceContainer::with_deps(settings, store.clone())?;
    debug!("execute_command: forest file {}", file.path().display());

    dispatch(&container, &cli.command)?;

    if cli.command.mutates() {
        file.save(&store, container.settings.pretty_json)?;
    }
    Ok(())
}

fn dispatch(c: &ServiceContainer, command: &Commands) -> CliResult<()> {
    match command {
        Commands::Show { tree, node } => _show(c, *tree, node.map(NodeId)),
        Commands::Trees => _trees(c),
        Commands::Add { tree, parent, set } => _add(c, *tree, parent.map(NodeId), set),
        Commands::Insert { tree, position, set } => _insert(c, *tree, position, set),
        Commands::Move {
            node,
            tree,
            to_tree,
            position,
        } => _move(c, NodeId(*node), *tree, to_tree.map(TreeId), position),
        Commands::Delete { node, tree, keep_gaps } => _delete(c, NodeId(*node), *tree, *keep_gaps),
        Commands::CloseGaps { tree } => _close_gaps(c, *tree),
        Commands::Update { node, tree, set } => _update(c, NodeId(*node), *tree, set),
        Commands::Get { node, tree } => _get(c, NodeId(*node), *tree),
        Commands::Path { node, tree, fields } => _path(c, NodeId(*node), *tree, fields),
        Commands::Children {
            node,
            tree,
            limit,
            reverse,
            index,
        } => _children(c, NodeId(*node), *tree, *limit, *reverse, *index),
        Commands::Leaves { tree, node } => {
            let tree = resolve(c, *tree)?;
            print_ids(&c.traversal().leaves(tree, node.map(NodeId))?);
            Ok(())
        }
        Commands::Levels { tree } => {
            let tree = resolve(c, *tree)?;
            for (id, level) in c.traversal().levels(tree)? {
                output::info(&format!("{}\t{}", id, level));
            }
            Ok(())
        }
        Commands::Height { tree } => {
            let tree = resolve(c, *tree)?;
            output::info(&c.traversal().height(tree)?);
            Ok(())
        }
        Commands::Size { tree, node } => {
            let tree = resolve(c, *tree)?;
            output::info(&c.traversal().size(tree, node.map(NodeId))?);
            Ok(())
        }
        Commands::Descendants { tree, node } => {
            let tree = resolve(c, *tree)?;
            print_ids(&c.traversal().descendants(tree, node.map(NodeId))?);
            Ok(())
        }
        Commands::Check { tree } => _check(c, tree.map(TreeId)),
        Commands::Export { trees, fields, output: target } => _export(c, trees, fields, target.as_ref()),
        Commands::Import { input } => _import(c, input),
        Commands::Config | Commands::Completion { .. } => Ok(()),
    }
}

fn resolve(c: &ServiceContainer, arg: TreeArg) -> CliResult<TreeId> {
    Ok(c.forest().resolve(arg.tree.map(TreeId))?)
}

fn print_ids(ids: &[NodeId]) {
    for id in ids {
        output::info(id);
    }
}

#[instrument(skip(c))]
fn _show(c: &ServiceContainer, tree: TreeArg, node: Option<NodeId>) -> CliResult<()> {
    let trees = match (tree.tree, node) {
        (None, None) => c.forest().tree_ids()?,
        _ => vec![resolve(c, tree)?],
    };
    if trees.is_empty() {
        output::warning("forest is empty");
    }
    for tree in trees {
        let arena = c.traversal().materialize(tree, node)?;
        output::header(&format!("tree {}", tree));
        output::info(&arena.to_termtree(|n| format!("{} {}", n.label(), n.interval)));
    }
    Ok(())
}

#[instrument(skip(c))]
fn _trees(c: &ServiceContainer) -> CliResult<()> {
    for summary in c.forest().summaries()? {
        let root = summary.root.map_or_else(|| "-".to_string(), |r| r.to_string());
        output::info(&format!("{}\troot={}\tsize={}", summary.tree, root, summary.size));
    }
    Ok(())
}

#[instrument(skip(c))]
fn _add(c: &ServiceContainer, tree: TreeArg, parent: Option<NodeId>, set: &[String]) -> CliResult<()> {
    let payload = parse_assignments(set)?;
    // a parentless add starts a new tree unless one is named
    let tree = match (tree.tree, parent) {
        (None, None) => c.forest().fresh_tree_id()?,
        _ => resolve(c, tree)?,
    };
    let id = c.mutation().append_child(tree, parent, payload)?;
    output::info(&id);
    Ok(())
}

#[instrument(skip(c))]
fn _insert(c: &ServiceContainer, tree: TreeArg, position: &PositionArgs, set: &[String]) -> CliResult<()> {
    let payload = parse_assignments(set)?;
    let tree = resolve(c, tree)?;
    let mutation = c.mutation();
    let id = match Position::try_from(position)? {
        Position::Before(sibling) => mutation.insert_before(tree, sibling, payload)?,
        Position::After(sibling) => mutation.insert_after(tree, sibling, payload)?,
        Position::Child { parent, index: None } => mutation.append_child(tree, Some(parent), payload)?,
        Position::Child {
            parent,
            index: Some(index),
        } => mutation.insert_child_at_index(tree, parent, index, payload)?,
    };
    output::info(&id);
    Ok(())
}

#[instrument(skip(c))]
fn _move(
    c: &ServiceContainer,
    node: NodeId,
    tree: TreeArg,
    to_tree: Option<TreeId>,
    position: &PositionArgs,
) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let to_tree = to_tree.unwrap_or(tree);
    let mutation = c.mutation();
    match Position::try_from(position)? {
        Position::Before(reference) => mutation.move_before(tree, node, to_tree, reference)?,
        Position::After(reference) => mutation.move_after(tree, node, to_tree, reference)?,
        Position::Child { parent, index: None } => mutation.move_to_last_child(tree, node, to_tree, parent)?,
        Position::Child {
            parent,
            index: Some(index),
        } => mutation.move_at_index(tree, node, to_tree, parent, index)?,
    }
    output::success(&format!("moved {} to tree {}", node, to_tree));
    Ok(())
}

#[instrument(skip(c))]
fn _delete(c: &ServiceContainer, node: NodeId, tree: TreeArg, keep_gaps: bool) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let close = c.settings.close_gaps_on_delete && !keep_gaps;
    let removed = c.mutation().delete_node(tree, node, close)?;
    output::success(&format!("deleted {} nodes", removed));
    if !close {
        output::warning(&format!("tree {} has gaps; run close-gaps before structural queries", tree));
    }
    Ok(())
}

#[instrument(skip(c))]
fn _close_gaps(c: &ServiceContainer, tree: TreeArg) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let changed = c.mutation().close_gaps(tree)?;
    output::success(&format!("renumbered {} nodes", changed));
    Ok(())
}

#[instrument(skip(c))]
fn _update(c: &ServiceContainer, node: NodeId, tree: TreeArg, set: &[String]) -> CliResult<()> {
    let payload = parse_assignments(set)?;
    let tree = resolve(c, tree)?;
    c.mutation().update_node(tree, node, payload)?;
    output::success(&format!("updated {}", node));
    Ok(())
}

#[instrument(skip(c))]
fn _get(c: &ServiceContainer, node: NodeId, tree: TreeArg) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let traversal = c.traversal();
    let data = traversal.node(tree, node)?;
    let parent = traversal.parent(tree, node)?;
    output::header(&data.label());
    output::field("tree", &data.tree);
    output::field("interval", &data.interval);
    output::field("parent", &parent.map_or_else(|| "-".to_string(), |p| p.to_string()));
    for (name, value) in &data.payload {
        output::field(name, value);
    }
    Ok(())
}

#[instrument(skip(c))]
fn _path(c: &ServiceContainer, node: NodeId, tree: TreeArg, fields: &[String]) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let traversal = c.traversal();
    match fields {
        [] => output::info(&traversal.path_squashed(tree, node, None)?.iter().join(" > ")),
        [field] => output::info(&traversal.path_squashed(tree, node, Some(field.as_str()))?.iter().join(" > ")),
        _ => {
            for row in traversal.path_fields(tree, node, fields)? {
                output::info(&row.iter().join("\t"));
            }
        }
    }
    Ok(())
}

#[instrument(skip(c))]
fn _children(
    c: &ServiceContainer,
    node: NodeId,
    tree: TreeArg,
    limit: Option<usize>,
    reverse: bool,
    index: Option<i64>,
) -> CliResult<()> {
    let tree = resolve(c, tree)?;
    let traversal = c.traversal();
    match index {
        Some(index) => output::info(&traversal.child_at_index(tree, node, index)?),
        None => print_ids(&traversal.first_n_children(tree, node, limit, !reverse)?),
    }
    Ok(())
}

#[instrument(skip(c))]
fn _check(c: &ServiceContainer, tree: Option<TreeId>) -> CliResult<()> {
    let trees = match tree {
        Some(tree) => vec![tree],
        None => c.forest().tree_ids()?,
    };
    let mut first_failure: Option<DomainError> = None;
    for tree in trees {
        match c.traversal().verify(tree) {
            Ok(()) => output::success(&format!("tree {}: ok", tree)),
            Err(e) => {
                output::failure(&e);
                match e.domain() {
                    Some(domain) if first_failure.is_none() => first_failure = Some(domain.clone()),
                    Some(_) => {}
                    None => return Err(e.into()),
                }
            }
        }
    }
    match first_failure {
        Some(e) => Err(crate::application::ApplicationError::from(e).into()),
        None => Ok(()),
    }
}

#[instrument(skip(c))]
fn _export(c: &ServiceContainer, trees: &[u64], fields: &[String], target: Option<&PathBuf>) -> CliResult<()> {
    let trees: Vec<TreeId> = trees.iter().copied().map(TreeId).collect();
    let fields = (!fields.is_empty()).then_some(fields);
    let json = c.exchange().export_json(&trees, fields, c.settings.pretty_json)?;
    match target {
        Some(path) => {
            std::fs::write(path, json).map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::success(&format!("exported to {}", path.display()));
        }
        None => output::info(&json),
    }
    Ok(())
}

#[instrument(skip(c))]
fn _import(c: &ServiceContainer, input: &PathBuf) -> CliResult<()> {
    let json = std::fs::read_to_string(input).map_err(|e| InfraError::io(format!("read {}", input.display()), e))?;
    let trees = c.exchange().import_json(&json)?;
    output::success(&format!("imported trees {}", trees.iter().join(", ")));
    Ok(())
}

#[instrument]
fn _completion(shell: clap_complete::Shell) -> CliResult<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut io::stdout());
    Ok(())
}
