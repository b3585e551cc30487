//! End-to-end `build` pipeline: order list → assemble → transduce → chunk →
//! artifacts.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{info, instrument};

use manualkit_chunker::{ChunkStats, StructuralChunker};
use manualkit_fragments::{
    CrossReferenceMap, DirSource, FragmentAssembler, FragmentError, read_order_list,
};
use manualkit_markup::{AuditLog, render_page, to_markdown, transduce};
use manualkit_shared::{
    AppConfig, CURRENT_SCHEMA_VERSION, Chunk, ChunkingConfig, ManualKitError, RenderConfig,
    Result, RunId, RunManifest,
};

use crate::output::{
    self, CHUNKS_FILE, HTML_FILE, MAPPING_FILE, MARKDOWN_FILE, MERGED_XML_FILE,
};

/// Configuration for the `build` pipeline.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Fragment order list.
    pub order_file: PathBuf,
    /// Directory holding the fragments.
    pub xml_dir: PathBuf,
    /// Directory receiving the artifacts.
    pub output_dir: PathBuf,
    /// Pre-built cross-reference table to merge in.
    pub xref_table: Option<PathBuf>,
    pub render: RenderConfig,
    pub chunking: ChunkingConfig,
    /// Tool version string.
    pub tool_version: String,
}

impl BuildConfig {
    /// Take paths and settings from the application config.
    pub fn from_app_config(config: &AppConfig, tool_version: impl Into<String>) -> Self {
        Self {
            order_file: PathBuf::from(&config.source.order_file),
            xml_dir: PathBuf::from(&config.source.xml_dir),
            output_dir: PathBuf::from(&config.output.dir),
            xref_table: config.source.xref_table.as_ref().map(PathBuf::from),
            render: config.render.clone(),
            chunking: config.chunking.clone(),
            tool_version: tool_version.into(),
        }
    }
}

/// Result of the `build` pipeline.
#[derive(Debug)]
pub struct BuildResult {
    pub output_dir: PathBuf,
    /// The manifest that was written.
    pub manifest: RunManifest,
    /// Fragments that were skipped.
    pub fragment_errors: Vec<FragmentError>,
    /// Everything the transducer recovered from.
    pub audit: AuditLog,
    pub stats: ChunkStats,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called for every chunk as it is cut.
    fn chunk_emitted(&self, current: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &BuildResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn chunk_emitted(&self, _current: usize) {}
    fn done(&self, _result: &BuildResult) {}
}

/// Run the full `build` pipeline.
///
/// 1. Read the fragment order list
/// 2. Assemble fragments into one document and cross-reference map
/// 3. Transduce the document to markup
/// 4. Wrap as an HTML page and export Markdown
/// 5. Chunk the markup
/// 6. Write artifacts and the run manifest
#[instrument(skip_all, fields(xml_dir = %config.xml_dir.display(), out = %config.output_dir.display()))]
pub fn build(config: &BuildConfig, progress: &dyn ProgressReporter) -> Result<BuildResult> {
    let start = Instant::now();
    let run_id = RunId::new();
    info!(%run_id, "starting build pipeline");

    // Fail on a bad chunking setup before doing any work.
    let chunker = StructuralChunker::new(config.chunking.clone())?;

    // --- Phase 1: Order list ---
    progress.phase("Reading fragment order");
    let refs = read_order_list(&config.order_file)?;

    // --- Phase 2: Assembly ---
    progress.phase("Assembling fragments");
    let source = DirSource::open(&config.xml_dir)?;
    let assembled = FragmentAssembler::new(source).assemble(&refs);
    if assembled.document.is_empty() {
        return Err(ManualKitError::validation(format!(
            "none of the {} fragments could be assembled",
            refs.len()
        )));
    }

    let mut xrefs = assembled.xrefs;
    if let Some(table) = &config.xref_table {
        let prebuilt = CrossReferenceMap::read_table(table)?;
        let before = xrefs.len();
        xrefs.merge(&prebuilt);
        info!(added = xrefs.len() - before, "merged pre-built cross-reference table");
    }
    let mapping = xrefs.to_table_string()?;
    let merged_xml = assembled.document.to_xml();

    // --- Phase 3: Transduction ---
    progress.phase("Converting to markup");
    let transduced = transduce(&assembled.document, xrefs, &config.render);

    // --- Phase 4: Page and Markdown ---
    progress.phase("Rendering page and Markdown");
    let page = render_page(
        &transduced.markup,
        &config.render.document_title,
        &config.render.stylesheet,
    );
    let markdown = to_markdown(&transduced.markup)?;

    // --- Phase 5: Chunking ---
    progress.phase("Chunking");
    let chunks = collect_chunks(&chunker, &transduced.markup, progress);
    let stats = ChunkStats::from_chunks(&chunks);
    info!(%stats, "chunking complete");
    let jsonl = output::chunks_to_jsonl(&chunks)?;

    // --- Phase 6: Artifacts ---
    progress.phase("Writing artifacts");
    let artifacts = output::write_artifacts(
        &config.output_dir,
        &[
            (MERGED_XML_FILE, merged_xml.as_str()),
            (MAPPING_FILE, mapping.as_str()),
            (HTML_FILE, page.as_str()),
            (MARKDOWN_FILE, markdown.as_str()),
            (CHUNKS_FILE, jsonl.as_str()),
        ],
    )?;

    let manifest = RunManifest {
        schema_version: CURRENT_SCHEMA_VERSION,
        id: run_id,
        tool_version: config.tool_version.clone(),
        created_at: chrono::Utc::now(),
        source_dir: config.xml_dir.display().to_string(),
        fragment_count: refs.len(),
        section_count: assembled.document.len(),
        fragment_errors: assembled.errors.iter().map(ToString::to_string).collect(),
        chunk_policy: chunker.config().policy.to_string(),
        chunk_count: chunks.len(),
        skipped_tags: transduced.audit.skipped_tags(),
        artifacts,
    };
    output::write_manifest(&config.output_dir, &manifest)?;

    let result = BuildResult {
        output_dir: config.output_dir.clone(),
        manifest,
        fragment_errors: assembled.errors,
        audit: transduced.audit,
        stats,
        elapsed: start.elapsed(),
    };

    progress.done(&result);

    info!(
        run_id = %result.manifest.id,
        sections = result.manifest.section_count,
        chunks = result.manifest.chunk_count,
        elapsed_ms = result.elapsed.as_millis(),
        "build pipeline complete"
    );

    Ok(result)
}

/// Chunk an existing markup file into a JSON Lines file.
#[instrument(skip_all, fields(input = %input.display(), dest = %dest.display()))]
pub fn chunk_file(
    input: &Path,
    dest: &Path,
    chunking: &ChunkingConfig,
    progress: &dyn ProgressReporter,
) -> Result<ChunkStats> {
    let chunker = StructuralChunker::new(chunking.clone())?;

    progress.phase("Reading markup");
    let markup = std::fs::read_to_string(input).map_err(|e| ManualKitError::io(input, e))?;

    progress.phase("Chunking");
    let chunks = collect_chunks(&chunker, &markup, progress);
    let stats = ChunkStats::from_chunks(&chunks);

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ManualKitError::io(parent, e))?;
    }
    std::fs::write(dest, output::chunks_to_jsonl(&chunks)?)
        .map_err(|e| ManualKitError::io(dest, e))?;

    info!(%stats, "chunk file written");
    Ok(stats)
}

fn collect_chunks(
    chunker: &StructuralChunker,
    markup: &str,
    progress: &dyn ProgressReporter,
) -> Vec<Chunk> {
    chunker
        .chunks(markup)
        .enumerate()
        .map(|(i, chunk)| {
            progress.chunk_emitted(i + 1);
            chunk
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
