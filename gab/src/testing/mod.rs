pub mod context;
pub mod su;

pub use context::{mock_context, tmp_context, MockContext, TestContext};
pub use su::{fake_su, mock_su, FakeSu, MockSu};
