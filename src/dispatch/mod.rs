pub mod dispatcher;
pub mod ticket;

pub use dispatcher::{ActionBody, ActionFuture, TaskDispatcher};
pub use ticket::{ActionTicket, IdempotencyScope};
