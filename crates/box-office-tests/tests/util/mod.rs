use box_office_tests::{Consultation, TestCtx};
use eyre::{eyre, Result};

/// Consults `show` and fails the test if it does not exist.
#[allow(unused)]
pub async fn seats_left(ctx: &TestCtx, show: &str) -> Result<u8> {
    match ctx.api.consult(show).await? {
        Consultation::Seats(seats) => Ok(seats),
        Consultation::NotFound => Err(eyre!("{show} must be part of the catalog.")),
    }
}
