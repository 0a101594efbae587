//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use caselink_core::{
    AnalysisConfig, CaseGraphError, CaseLink, CaseRecord, EdgeType, GraphStore, Investigation,
    LinkId, Traversal,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum size of a case file (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_CASE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum number of case records in one file.
const MAX_CASE_COUNT: usize = 100_000;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), CaseGraphError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| CaseGraphError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(CaseGraphError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path, rejecting anything that is not an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, CaseGraphError> {
    let canonical = path.canonicalize().map_err(|e| {
        CaseGraphError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(CaseGraphError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path against its canonical parent directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, CaseGraphError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        CaseGraphError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(CaseGraphError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| CaseGraphError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

fn print_json(value: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Read a JSON array of case records.
pub fn load_cases(file: &Path) -> Result<Vec<CaseRecord>, CaseGraphError> {
    let validated_path = validate_file_path(file)?;
    validate_file_size(&validated_path, MAX_CASE_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| CaseGraphError::IoError(format!("Read file: {}", e)))?;
    let cases: Vec<CaseRecord> = serde_json::from_slice(&contents)
        .map_err(|e| CaseGraphError::SerializationError(format!("Parse cases: {}", e)))?;

    if cases.len() > MAX_CASE_COUNT {
        return Err(CaseGraphError::SerializationError(format!(
            "Case count {} exceeds maximum allowed {}",
            cases.len(),
            MAX_CASE_COUNT
        )));
    }
    Ok(cases)
}

/// Build an investigation from the case file at `file`.
pub fn build_investigation(config: &AnalysisConfig, file: &Path) -> Result<Investigation, CaseGraphError> {
    tracing::info!("Loading cases from {:?}", file);
    let cases = load_cases(file)?;
    let mut investigation = Investigation::with_config(*config)?;
    let count = investigation.ingest_cases(cases)?;
    tracing::info!(
        cases = count,
        nodes = investigation.graph().node_count(),
        edges = investigation.graph().edge_count(),
        "investigation built"
    );
    Ok(investigation)
}

/// Parse a comma-separated edge type list such as `suspect_of,found_at`.
pub fn parse_edge_types(list: &str) -> Result<Vec<EdgeType>, CaseGraphError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

fn link_summary(link: &CaseLink) -> serde_json::Value {
    serde_json::json!({
        "id": link.id.0,
        "case_a": link.case_a,
        "case_b": link.case_b,
        "link_type": link.link_type.as_str(),
        "strength": link.strength,
        "state": link.state,
        "evidence_basis": link.evidence_basis,
        "behavioral_basis": link.behavioral_basis,
    })
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show graph and link status.
pub fn cmd_status(config: &AnalysisConfig, json_mode: bool, file: &Path) -> Result<(), CaseGraphError> {
    let mut investigation = build_investigation(config, file)?;
    investigation.link_all(config.min_similarity)?;
    let metrics = investigation.metrics();

    if json_mode {
        let output = serde_json::json!({
            "file": file.to_string_lossy(),
            "min_similarity": config.min_similarity,
            "metrics": metrics,
        });
        print_json(&output);
        return Ok(());
    }

    println!("Caselink Status");
    println!("===============");
    println!("File:           {:?}", file);
    println!("Min similarity: {}", config.min_similarity);
    println!();
    println!("Cases:          {}", metrics.case_count);
    println!("Nodes:          {}", metrics.node_count);
    println!(
        "Edges:          {} ({} duplicate)",
        metrics.edge_count, metrics.duplicate_edge_count
    );
    for (node_type, count) in &metrics.nodes_by_type {
        println!("  {:<16}{}", node_type.as_str(), count);
    }
    println!();
    println!(
        "Links:          {} pending, {} confirmed, {} rejected",
        metrics.pending_links, metrics.confirmed_links, metrics.rejected_links
    );
    println!(
        "Clusters:       {} (min size {})",
        metrics.cluster_count, config.min_cluster_size
    );

    Ok(())
}

// =============================================================================
// SIMILAR COMMAND
// =============================================================================

/// List cases similar to `case_id`.
pub fn cmd_similar(
    config: &AnalysisConfig,
    json_mode: bool,
    file: &Path,
    case_id: &str,
) -> Result<(), CaseGraphError> {
    let investigation = build_investigation(config, file)?;
    let results = investigation.similar_to(case_id, config.min_similarity)?;

    if json_mode {
        print_json(&serde_json::json!({ "case_id": case_id, "results": results }));
        return Ok(());
    }

    if results.is_empty() {
        println!("No cases at or above {} similar to {}", config.min_similarity, case_id);
        return Ok(());
    }

    println!("Cases similar to {}:", case_id);
    for r in &results {
        println!(
            "  {:<20} overall {:.3}  (mo {:.2}, behavioral {:.2}, temporal {:.2}, geographic {:.2})",
            r.target_case, r.overall, r.mo, r.behavioral, r.temporal, r.geographic
        );
        if !r.matching_patterns.is_empty() {
            println!("    patterns: {}", r.matching_patterns.join(", "));
        }
        if !r.common_entities.is_empty() {
            println!("    entities: {}", r.common_entities.join(", "));
        }
    }

    Ok(())
}

// =============================================================================
// LINK COMMAND
// =============================================================================

/// Review decisions to apply after link analysis.
#[derive(Debug, Default, Clone)]
pub struct Review {
    pub confirm: Vec<u64>,
    pub reject: Vec<u64>,
    pub reviewer: String,
    pub reason: String,
}

/// Propose links, then apply review decisions.
pub fn cmd_link(
    config: &AnalysisConfig,
    json_mode: bool,
    file: &Path,
    review: &Review,
) -> Result<(), CaseGraphError> {
    let mut investigation = build_investigation(config, file)?;
    let created = investigation.link_all(config.min_similarity)?;

    for &id in &review.confirm {
        investigation.confirm_link(LinkId(id), &review.reviewer)?;
    }
    for &id in &review.reject {
        investigation.reject_link(LinkId(id), &review.reviewer, &review.reason)?;
    }

    let links: Vec<serde_json::Value> = investigation.linker().links().map(link_summary).collect();

    if json_mode {
        print_json(&serde_json::json!({ "created": created.len(), "links": links }));
        return Ok(());
    }

    println!("Created {} links", created.len());
    for link in investigation.linker().links() {
        println!(
            "  [{}] {} <-> {}  {:<20} {:.3}  {:?}",
            link.id,
            link.case_a,
            link.case_b,
            link.link_type.as_str(),
            link.strength,
            link.state
        );
    }

    Ok(())
}

// =============================================================================
// CLUSTERS COMMAND
// =============================================================================

/// Show clusters of linked cases.
pub fn cmd_clusters(config: &AnalysisConfig, json_mode: bool, file: &Path) -> Result<(), CaseGraphError> {
    let mut investigation = build_investigation(config, file)?;
    investigation.link_all(config.min_similarity)?;
    let clusters = investigation.clusters(config.min_cluster_size);

    if json_mode {
        print_json(&serde_json::json!({
            "min_size": config.min_cluster_size,
            "clusters": clusters,
        }));
        return Ok(());
    }

    if clusters.is_empty() {
        println!("No clusters of {} or more cases", config.min_cluster_size);
        return Ok(());
    }

    for (i, cluster) in clusters.iter().enumerate() {
        let members: Vec<&str> = cluster.iter().map(String::as_str).collect();
        println!("Cluster {} ({} cases): {}", i + 1, cluster.len(), members.join(", "));
    }

    Ok(())
}

// =============================================================================
// TRAVERSE COMMAND
// =============================================================================

/// Show the neighborhood of `case_id`, or the hop path to `to`.
pub fn cmd_traverse(
    config: &AnalysisConfig,
    json_mode: bool,
    file: &Path,
    case_id: &str,
    to: Option<&str>,
    edge_types: Option<Vec<EdgeType>>,
) -> Result<(), CaseGraphError> {
    let investigation = build_investigation(config, file)?;
    let graph = investigation.graph();
    let case_node = |id: &str| {
        graph
            .case_node(id)
            .map(|n| n.id)
            .ok_or_else(|| CaseGraphError::UnknownCase(id.to_string()))
    };
    let start = case_node(case_id)?;

    let mut traversal = Traversal::new(config.max_depth);
    if let Some(types) = edge_types {
        traversal = traversal.with_edge_types(types);
    }
    if let Some(ms) = config.analysis_timeout_ms {
        traversal = traversal.with_timeout(Duration::from_millis(ms));
    }

    if let Some(target) = to {
        let path = traversal.hop_path(graph, start, case_node(target)?)?;
        let labels: Vec<String> = path
            .iter()
            .flatten()
            .filter_map(|id| graph.get_node(*id))
            .map(|n| format!("{}:{}", n.node_type, n.label))
            .collect();

        if json_mode {
            print_json(&serde_json::json!({ "from": case_id, "to": target, "path": labels }));
        } else if labels.is_empty() {
            println!("No path from {} to {} within {} hops", case_id, target, config.max_depth);
        } else {
            println!("{}", labels.join(" -> "));
        }
        return Ok(());
    }

    let reached = traversal.run(graph, start)?;
    let related = traversal.related_cases(graph, start)?;

    if json_mode {
        print_json(&serde_json::json!({
            "case_id": case_id,
            "max_depth": config.max_depth,
            "reached": reached,
            "related_cases": related,
        }));
        return Ok(());
    }

    println!("Traversal from {} (depth {}):", case_id, config.max_depth);
    for r in &reached {
        println!(
            "  {}{} {} via {}",
            "  ".repeat(r.depth.saturating_sub(1)),
            r.node.node_type,
            r.node.label,
            r.edge.edge_type
        );
    }
    if !related.is_empty() {
        println!();
        println!("Related cases:");
        for r in &related {
            println!("  {} ({} hops)", r.case_id, r.depth);
        }
    }

    Ok(())
}

// =============================================================================
// SHARED COMMAND
// =============================================================================

/// List entities shared by two cases.
pub fn cmd_shared(
    config: &AnalysisConfig,
    json_mode: bool,
    file: &Path,
    case_a: &str,
    case_b: &str,
) -> Result<(), CaseGraphError> {
    let investigation = build_investigation(config, file)?;
    for case_id in [case_a, case_b] {
        if investigation.case(case_id).is_none() {
            return Err(CaseGraphError::UnknownCase(case_id.to_string()));
        }
    }
    let shared = investigation.shared_entities(case_a, case_b);

    if json_mode {
        print_json(&serde_json::json!({
            "case_a": case_a,
            "case_b": case_b,
            "shared": shared,
        }));
        return Ok(());
    }

    println!("{} shared entities between {} and {}", shared.len(), case_a, case_b);
    for node in shared {
        println!("  {:<14} {}", node.node_type.as_str(), node.label);
    }

    Ok(())
}

// =============================================================================
// EXPORT COMMAND
// =============================================================================

/// Write the graph snapshot and all links as JSON.
pub fn cmd_export(config: &AnalysisConfig, file: &Path, output: &Path) -> Result<(), CaseGraphError> {
    let validated_output = validate_output_path(output)?;

    let mut investigation = build_investigation(config, file)?;
    investigation.link_all(config.min_similarity)?;

    let links: Vec<&CaseLink> = investigation.linker().links().collect();
    let export = serde_json::json!({
        "graph": investigation.graph().snapshot(),
        "links": links,
        "metrics": investigation.metrics(),
    });
    let data = serde_json::to_vec_pretty(&export)
        .map_err(|e| CaseGraphError::SerializationError(e.to_string()))?;

    std::fs::write(&validated_output, &data)
        .map_err(|e| CaseGraphError::IoError(format!("Write file: {}", e)))?;

    println!("Exported {} bytes to {:?}", data.len(), validated_output);

    Ok(())
}
