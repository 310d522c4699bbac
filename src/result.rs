use crate::error::TicketError;

pub type TicketResult<T> = Result<T, TicketError>;
