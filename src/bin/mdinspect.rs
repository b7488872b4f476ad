use std::{env, fs, path::PathBuf, process};

use anyhow::{Context, Result};

use mathdoc::{Document, NodeId, NodeKind, Tree};

fn main() -> Result<()> {
    env_logger::init();
    let mut args = env::args().skip(1);
    let Some(first) = args.next() else {
        usage();
        process::exit(2);
    };
    let (plain, path) = match first.as_str() {
        "-h" | "--help" => {
            usage();
            return Ok(());
        }
        "--text" => {
            let Some(path) = args.next() else {
                usage();
                process::exit(2);
            };
            (true, PathBuf::from(path))
        }
        _ => (false, PathBuf::from(first)),
    };

    let input = fs::read_to_string(&path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let document = if plain {
        Document::from_plain_text(&input)
    } else {
        Document::from_markup(&input)
            .with_context(|| format!("cannot parse {}", path.display()))?
    };
    document.validate().context("tree fails validation")?;

    let tree = document.tree();
    println!(
        "{}: {} nodes in {} runs",
        path.display(),
        count_nodes(tree, tree.root()),
        tree.run_count()
    );
    for run in 0..tree.run_count() {
        let range = tree.run_range(run);
        let terminator = tree.run_terminator(run);
        let style = tree
            .node(terminator)
            .paragraph_style
            .map(|s| format!("{} +{}", s.kind.label(), s.indent))
            .unwrap_or_else(|| "default".to_string());
        println!("run {run}: {} nodes, {style}", range.len());
    }
    println!();
    dump(tree, tree.root(), 0);
    Ok(())
}

fn usage() {
    eprintln!("usage: mdinspect [--text] <file>");
    eprintln!("  parse a markup (or, with --text, plain text) document,");
    eprintln!("  validate it and print its run and tree structure");
}

fn count_nodes(tree: &Tree, id: NodeId) -> usize {
    1 + tree
        .node(id)
        .children()
        .iter()
        .map(|&child| count_nodes(tree, child))
        .sum::<usize>()
}

fn dump(tree: &Tree, id: NodeId, depth: usize) {
    let node = tree.node(id);
    let mut line = format!("{}{}", "  ".repeat(depth), node.kind.label());
    match &node.kind {
        NodeKind::Char(ch) => line.push_str(&format!(" {ch:?}")),
        NodeKind::Symbol(name) => line.push_str(&format!(" {name}")),
        NodeKind::Media(handle) => line.push_str(&format!(" #{handle}")),
        _ => {}
    }
    if !node.styles.is_empty() {
        let labels: Vec<_> = node.styles.iter().map(|s| s.label()).collect();
        line.push_str(&format!(" [{}]", labels.join(",")));
    }
    if let Some(link) = &node.link_target {
        line.push_str(&format!(" -> {link}"));
    }
    println!("{line}");
    for &child in node.children() {
        dump(tree, child, depth + 1);
    }
}
