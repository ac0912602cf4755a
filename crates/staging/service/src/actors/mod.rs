//! [StagingActor] services of the staging pipeline.

mod traits;
pub use traits::StagingActor;

mod forwarder;
pub use forwarder::ForwarderActor;

mod rpc;
pub use rpc::RpcActor;
