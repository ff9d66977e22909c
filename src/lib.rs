//! TrayNest hides top-level windows into the notification area and
//! brings them back on demand. The service modules here carry the whole
//! stateful core: eligibility, icon identity, the hidden-window registry,
//! its persisted snapshot and the reconciliation paths that re-align all
//! of it with the OS after a crash or an Explorer restart.

pub mod services;
