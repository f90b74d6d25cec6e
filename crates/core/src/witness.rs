/// Module running the full witness analysis for one contract.
///
/// [`analyze`] ties the stages together: boundary heuristics, function discovery (or
/// whole-contract discovery for bytecode without a known preamble), block consolidation, leaf
/// encoding and the three chunking strategies. Nothing is shared between calls.
///
/// # Usage
/// ```rust,ignore
/// let report = analyze(&code, &AnalysisConfig::default())?;
/// if let WitnessMode::PerFunction(functions) = &report.mode {
///     for (selector, function) in functions {
///         println!("{selector:#010x}: {} bytes", function.witness_bytes());
///     }
/// }
/// ```
use crate::cfg_ir::{
    BlockMap, Coverage, Discovery, Selector, discover_functions, discover_whole_contract,
};
use crate::chunking::{Chunk, Strategy, chunk};
use crate::config::AnalysisConfig;
use crate::consolidate::consolidate;
use crate::decoder::keccak256;
use crate::detection::{
    CodeBoundaries, detect_boundaries, detect_code_end, looks_like_known_preamble,
    valid_jump_destinations,
};
use crate::leaf::encode_leaf;
use indexmap::IndexMap;
use sliver_utils::errors::AnalysisError;

/// Witness for one function, or for the whole contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionWitness {
    /// Start of the segment holding the dispatch check (0 for the whole contract).
    pub dispatch_pc: usize,
    /// First PC of the function body (0 for the whole contract).
    pub entry_pc: usize,
    /// Reachable segments.
    pub blocks: BlockMap,
    /// Segments consolidated into runs.
    pub runs: BlockMap,
    /// Encoded leaf over `runs`.
    pub leaf: Vec<u8>,
}

impl FunctionWitness {
    /// Code bytes carried by the consolidated runs.
    pub fn witness_bytes(&self) -> usize {
        self.runs.values().sum()
    }
}

/// Per-function or whole-contract result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WitnessMode {
    /// Known preamble: one witness per discovered selector, in dispatch order.
    PerFunction(IndexMap<Selector, FunctionWitness>),
    /// Unknown preamble: a single witness for everything reachable from PC 0.
    WholeContract(FunctionWitness),
}

/// Chunk lists of the three strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSets {
    /// Fixed-size chunks.
    pub fixed: Vec<Chunk>,
    /// Jump-destination aligned chunks.
    pub jumpdest: Vec<Chunk>,
    /// Strict fixed-size chunks with first-instruction offsets.
    pub strict: Vec<Chunk>,
}

impl ChunkSets {
    /// Chunks of one strategy.
    pub fn get(&self, strategy: Strategy) -> &[Chunk] {
        match strategy {
            Strategy::Fixed => &self.fixed,
            Strategy::Jumpdest => &self.jumpdest,
            Strategy::Strict => &self.strict,
        }
    }
}

/// Everything the analysis of one contract produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessReport {
    /// Keccak-256 of the analyzed code.
    pub code_hash: [u8; 32],
    /// Length of the analyzed code.
    pub code_len: usize,
    /// Exclusive end of executable code used for validation.
    pub code_end: usize,
    /// Layout found by the boundary heuristics, if any.
    pub boundaries: Option<CodeBoundaries>,
    /// Function witnesses.
    pub mode: WitnessMode,
    /// Reachability of the executable code.
    pub coverage: Coverage,
    /// Concrete CODECOPY ranges seen during discovery.
    pub code_reads: Vec<(usize, usize)>,
    /// Strategy chunk lists over the whole code.
    pub chunks: ChunkSets,
}

impl WitnessReport {
    /// Number of attributed functions (0 in whole-contract mode).
    pub fn function_count(&self) -> usize {
        match &self.mode {
            WitnessMode::PerFunction(functions) => functions.len(),
            WitnessMode::WholeContract(_) => 0,
        }
    }
}

/// Analyzes one contract's runtime bytecode.
///
/// # Arguments
/// * `code` - Runtime bytecode.
/// * `config` - Chunk threshold, consolidation gap and traversal settings.
///
/// # Returns
/// The [`WitnessReport`], or a classified [`AnalysisError`].
pub fn analyze(code: &[u8], config: &AnalysisConfig) -> Result<WitnessReport, AnalysisError> {
    let code_hash = keccak256(code);
    let chunk_jumps = valid_jump_destinations(code, code.len());
    let chunks = ChunkSets {
        fixed: chunk(code, Strategy::Fixed, config.threshold, &chunk_jumps)?,
        jumpdest: chunk(code, Strategy::Jumpdest, config.threshold, &chunk_jumps)?,
        strict: chunk(code, Strategy::Strict, config.threshold, &chunk_jumps)?,
    };

    let (boundaries, code_end, discovery) = if looks_like_known_preamble(code) {
        let boundaries = detect_boundaries(code).ok_or(AnalysisError::SelectorBlockNotFound)?;
        let jumps = valid_jump_destinations(code, boundaries.code_end);
        let discovery = discover_functions(code, &jumps, &boundaries, config)?;
        let code_end = boundaries.code_end;
        (Some(boundaries), code_end, discovery)
    } else {
        tracing::debug!("unknown preamble, analyzing the whole contract");
        let code_end = detect_code_end(code, 0).unwrap_or(code.len());
        let jumps = valid_jump_destinations(code, code_end);
        let discovery = discover_whole_contract(code, &jumps, code_end, config)?;
        (None, code_end, discovery)
    };

    let Discovery {
        functions,
        merged,
        coverage,
        code_reads,
        ..
    } = discovery;

    let mode = if boundaries.is_some() {
        let mut witnesses = IndexMap::with_capacity(functions.len());
        for (selector, function) in functions {
            let witness = build_witness(
                code,
                function.dispatch_pc,
                function.entry_pc,
                function.blocks,
                config.gap,
            )?;
            witnesses.insert(selector, witness);
        }
        WitnessMode::PerFunction(witnesses)
    } else {
        WitnessMode::WholeContract(build_witness(code, 0, 0, merged, config.gap)?)
    };

    Ok(WitnessReport {
        code_hash,
        code_len: code.len(),
        code_end,
        boundaries,
        mode,
        coverage,
        code_reads,
        chunks,
    })
}

fn build_witness(
    code: &[u8],
    dispatch_pc: usize,
    entry_pc: usize,
    blocks: BlockMap,
    gap: usize,
) -> Result<FunctionWitness, AnalysisError> {
    let runs = consolidate(&blocks, gap)?;
    let leaf = encode_leaf(&runs, code)?;
    Ok(FunctionWitness {
        dispatch_pc,
        entry_pc,
        blocks,
        runs,
        leaf,
    })
}
