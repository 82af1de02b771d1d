//! Graphviz output for visual DAGs
//!
//! Each serialized block becomes a `subgraph cluster_N` of one digraph.
//! Nodes are records with a `seq` port plus one numbered port per operand;
//! sequence links are drawn dashed blue from the `seq` port.

use std::fmt::{self, Write};

use super::graph::VisualOpDag;

pub struct DagDotSerializer {
    out: String,
    clusters: usize,
}

impl Default for DagDotSerializer {
    fn default() -> Self {
        Self::new()
    }
}

impl DagDotSerializer {
    pub fn new() -> Self {
        Self {
            out: String::from("digraph {\nrankdir=\"BT\";\n"),
            clusters: 0,
        }
    }

    pub fn serialize(&mut self, graph: &VisualOpDag, label: &str) {
        self.clusters += 1;
        // Infallible for a String sink
        let _ = write_cluster(self.clusters, graph, label, &mut self.out);
    }

    /// Close the digraph and return the document
    pub fn finish(mut self) -> String {
        self.out.push_str("}\n");
        self.out
    }
}

/// Write one graph as `subgraph cluster_N`
pub fn write_cluster(
    cluster: usize,
    graph: &VisualOpDag,
    label: &str,
    out: &mut impl Write,
) -> fmt::Result {
    let mut seq_links = Vec::new();
    let mut edges = Vec::new();

    writeln!(out, "subgraph cluster_{cluster} {{")?;
    writeln!(out, "label=\"{}\";", escape(label))?;
    for (index, node) in graph.nodes().iter().enumerate() {
        let mut ports = String::from("<seq>seq");
        for (port, &dependency) in node.dependencies.iter().enumerate() {
            write!(ports, "|<{port}>{port}")?;
            edges.push((index, port, dependency));
        }
        let attributes: Vec<String> = node.attributes.iter().map(|a| escape(a)).collect();
        writeln!(
            out,
            "{} [shape=record,shape=Mrecord,label=\"{{{{{ports}}}|{}}}\"];",
            node_name(cluster, index),
            attributes.join("|")
        )?;
        if let Some(link) = node.seq_link {
            seq_links.push((index, link));
        }
    }

    for (from, to) in seq_links {
        writeln!(
            out,
            "{}:seq -> {}[color=blue,style=dashed];",
            node_name(cluster, from),
            node_name(cluster, to)
        )?;
    }
    for (from, port, to) in edges {
        writeln!(out, "{}:{port} -> {};", node_name(cluster, from), node_name(cluster, to))?;
    }
    writeln!(out, "}}")
}

fn node_name(cluster: usize, index: usize) -> String {
    format!("node_{cluster}_{index}")
}

/// Escape record-label metacharacters
fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '{' | '}' | '|' | '<' | '>' | '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
