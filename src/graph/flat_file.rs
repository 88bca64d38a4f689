//! Flat-file graph loader.
//!
//! Reads the text layout the CommonCrawl domain graph is published in:
//!
//! ```text
//! vertices.tsv   <id>\t<label>[\t<extra columns ignored>]
//! edges.tsv      <src id>\t<dst id>
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Ids must cover
//! `0..n` exactly once. Both files are memory-mapped and parsed into an
//! `InMemoryGraph`; the snapshot version is a BLAKE3 digest over both files.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{DiscoveryError, Result};
use super::{GraphStore, InMemoryGraph, VertexId};

pub const VERTICES_FILE: &str = "vertices.tsv";
pub const EDGES_FILE: &str = "edges.tsv";

/// Hex chars of the BLAKE3 digest kept as the snapshot version.
const VERSION_LEN: usize = 16;

/// Loader for graph directories in the flat TSV layout.
pub struct FlatFileGraph;

impl FlatFileGraph {
    /// Load `vertices.tsv` + `edges.tsv` from `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<InMemoryGraph> {
        let dir = dir.as_ref();
        let vertices = map_file(&dir.join(VERTICES_FILE))?;
        let edges = map_file(&dir.join(EDGES_FILE))?;
        let graph = Self::from_bytes(bytes_of(&vertices), bytes_of(&edges))?;
        tracing::info!(
            "loaded graph from {:?}: {} vertices, {} edges",
            dir,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }

    /// Parse a graph from in-memory file contents (for testing / embedding).
    pub fn from_bytes(vertices: &[u8], edges: &[u8]) -> Result<InMemoryGraph> {
        let labels = parse_vertices(vertices)?;
        let edge_list = parse_edges(edges)?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(vertices);
        hasher.update(edges);
        let digest = hasher.finalize().to_hex();
        let version = digest.as_str()[..VERSION_LEN].to_string();

        Ok(InMemoryGraph::from_parts(labels, &edge_list)?.with_version(version))
    }
}

fn map_file(path: &Path) -> Result<Option<Mmap>> {
    let file = File::open(path).map_err(DiscoveryError::Io)?;
    // Zero-length mappings are rejected on some platforms.
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }
    let mmap = unsafe { Mmap::map(&file) }.map_err(DiscoveryError::Io)?;
    Ok(Some(mmap))
}

fn bytes_of(map: &Option<Mmap>) -> &[u8] {
    map.as_deref().unwrap_or(&[])
}

/// Yield (1-based line number, columns) for every data line.
fn data_lines<'a>(
    file: &'static str,
    bytes: &'a [u8],
) -> Result<impl Iterator<Item = (usize, Vec<&'a str>)>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| DiscoveryError::InvalidFormat(format!("{}: invalid UTF-8: {}", file, e)))?;
    Ok(text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty() && !line.starts_with('#'))
        .map(|(n, line)| (n, line.split('\t').collect())))
}

fn parse_id(file: &str, line: usize, field: &str) -> Result<VertexId> {
    field.trim().parse::<VertexId>().map_err(|_| {
        DiscoveryError::InvalidFormat(format!("{}:{}: invalid vertex id '{}'", file, line, field))
    })
}

fn parse_vertices(bytes: &[u8]) -> Result<Vec<String>> {
    let mut rows = Vec::new();
    for (line, cols) in data_lines(VERTICES_FILE, bytes)? {
        if cols.len() < 2 || cols[1].is_empty() {
            return Err(DiscoveryError::InvalidFormat(format!(
                "{}:{}: expected <id>\\t<label>",
                VERTICES_FILE, line
            )));
        }
        rows.push((line, parse_id(VERTICES_FILE, line, cols[0])?, cols[1].to_string()));
    }

    let mut labels: Vec<Option<String>> = vec![None; rows.len()];
    for (line, id, label) in rows {
        let slot = labels.get_mut(id as usize).ok_or_else(|| {
            DiscoveryError::InvalidFormat(format!(
                "{}:{}: id {} is not dense (expected ids below the vertex count)",
                VERTICES_FILE, line, id
            ))
        })?;
        if slot.replace(label).is_some() {
            return Err(DiscoveryError::InvalidFormat(format!(
                "{}:{}: duplicate vertex id {}",
                VERTICES_FILE, line, id
            )));
        }
    }

    // n rows with no duplicates and every id < n means every slot is filled.
    Ok(labels.into_iter().flatten().collect())
}

fn parse_edges(bytes: &[u8]) -> Result<Vec<(VertexId, VertexId)>> {
    let mut edges = Vec::new();
    for (line, cols) in data_lines(EDGES_FILE, bytes)? {
        if cols.len() < 2 {
            return Err(DiscoveryError::InvalidFormat(format!(
                "{}:{}: expected <src>\\t<dst>",
                EDGES_FILE, line
            )));
        }
        edges.push((
            parse_id(EDGES_FILE, line, cols[0])?,
            parse_id(EDGES_FILE, line, cols[1])?,
        ));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERTICES: &str = "0\tcom.cnn\t12\n1\tcom.bbc\t3\n# comment\n\n2\torg.wikipedia\t900\n";
    const EDGES: &str = "0\t1\n2\t0\n2\t1\n";

    #[test]
    fn test_from_bytes_parses_layout() {
        let g = FlatFileGraph::from_bytes(VERTICES.as_bytes(), EDGES.as_bytes()).unwrap();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.domain_to_id("org.wikipedia").unwrap(), Some(2));
        assert_eq!(g.predecessors(1).unwrap(), vec![0, 2]);
    }

    #[test]
    fn test_version_is_content_digest() {
        let a = FlatFileGraph::from_bytes(VERTICES.as_bytes(), EDGES.as_bytes()).unwrap();
        let b = FlatFileGraph::from_bytes(VERTICES.as_bytes(), EDGES.as_bytes()).unwrap();
        let c = FlatFileGraph::from_bytes(VERTICES.as_bytes(), b"0\t1\n").unwrap();

        let va = a.version().unwrap();
        assert_eq!(va.len(), VERSION_LEN);
        assert_eq!(Some(va.clone()), b.version());
        assert_ne!(Some(va), c.version());
    }

    #[test]
    fn test_unordered_vertex_ids() {
        let g = FlatFileGraph::from_bytes(b"1\tb\n0\ta\n", b"").unwrap();
        assert_eq!(g.id_to_domain(0).unwrap(), Some("a".to_string()));
        assert_eq!(g.id_to_domain(1).unwrap(), Some("b".to_string()));
    }

    #[test]
    fn test_sparse_vertex_ids_rejected() {
        let err = FlatFileGraph::from_bytes(b"0\ta\n5\tb\n", b"").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidFormat(msg) if msg.contains("vertices.tsv:2")));
    }

    #[test]
    fn test_duplicate_vertex_id_rejected() {
        let err = FlatFileGraph::from_bytes(b"0\ta\n0\tb\n", b"").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidFormat(msg) if msg.contains("duplicate")));
    }

    #[test]
    fn test_malformed_edge_line_rejected() {
        let err = FlatFileGraph::from_bytes(b"0\ta\n", b"0 0\n").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidFormat(msg) if msg.contains("edges.tsv:1")));
    }

    #[test]
    fn test_edge_to_unknown_vertex_rejected() {
        let err = FlatFileGraph::from_bytes(b"0\ta\n", b"0\t3\n").unwrap_err();
        assert!(matches!(err, DiscoveryError::InvalidFormat(_)));
    }
}
