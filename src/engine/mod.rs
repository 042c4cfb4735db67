//! Engine modules: the pure layer that turns the collected answers into a
//! storage plan and the disk descriptor handed to the provisioning tools.
//!
//! Nothing here touches the system; the provisioner consumes the output.

pub mod descriptor;
pub mod storage;
