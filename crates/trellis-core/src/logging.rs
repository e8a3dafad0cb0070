//! Structured logging schema and field name constants for trellis.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue (per-item backfill failure, dropped LLM entries, slow ops) |
//! | INFO  | Lifecycle events (index initialized, backfill finished) |
//! | DEBUG | Decision points (cache hit/miss, fast-path returns, config choices) |
//! | TRACE | Per-item iteration, high-volume data (scan scores, parsed entries) |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "engine", "db", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "vector_index", "orchestrator", "semantic_cache", "proposer",
/// "ollama", "pool"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "query", "get_or_create", "backfill", "propose"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Concept UUID being operated on.
pub const CONCEPT_ID: &str = "concept_id";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a query or scan.
pub const RESULT_COUNT: &str = "result_count";

/// Number of input texts sent to an embedding model.
pub const INPUT_COUNT: &str = "input_count";

/// Byte length of a prompt or response.
pub const PROMPT_LEN: &str = "prompt_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Provider identifier ("ollama", "mock").
pub const PROVIDER: &str = "provider";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";

/// Slow operation threshold exceeded.
pub const SLOW: &str = "slow";

/// Threshold above which provider-bound and scan operations log a slow
/// warning, in milliseconds.
pub const SLOW_OP_THRESHOLD_MS: u128 = 1_000;
