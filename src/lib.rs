//! Refund Intake — unattended journaling of refund applications.
//!
//! Scans a mailbox folder for application emails, extracts the applicant's
//! identity number and invoice references from the body, finds or creates the
//! matching case in the case-management service, attaches the email as an
//! evidence document, reconciles the follow-up task deadline, and moves the
//! message out of the intake folder once everything succeeded.

pub mod clients;
pub mod config;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod records;
pub mod report;
