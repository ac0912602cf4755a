//! [`OrchestratorApi`] contains the endpoints a validating authority serves
//! to confirm staged blocks.

use crate::{BlockHash, BlockStatus};
use jsonrpsee::{core::RpcResult, proc_macros::rpc};

/// Using the proc_macro to generate the client and server code.
/// Default namespace separator is `_`.
#[rpc(client, server, namespace = "orc")]
pub trait OrchestratorApi {
    /// Returns one [`BlockStatus`] per requested [`BlockHash`], in request
    /// order.
    #[method(name = "confirmPanBlockHashes")]
    async fn confirm_pan_block_hashes(
        &self,
        request: Vec<BlockHash>,
    ) -> RpcResult<Vec<BlockStatus>>;
}
