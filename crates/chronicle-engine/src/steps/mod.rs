// Step executors
//
// The two non-terminal steps of the loop. Each one projects what it needs
// from the events it is handed, performs its side effect, and appends the
// outcome through the pass's cursor. It never inspects the stream's routing
// itself; that stays in the next-step projection.

pub mod llm;
pub mod tool;
