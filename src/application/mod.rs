// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data, ml
// and infra layers together for one command.
//
//   train_use_case.rs — a full training run
//   split_use_case.rs — write a validation manifest and stop

/// The training workflow
pub mod train_use_case;

/// The split-only workflow
pub mod split_use_case;

/// `YYYYmmddHHMMSS` in local time; names every file a run writes.
pub fn run_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S").to_string()
}
