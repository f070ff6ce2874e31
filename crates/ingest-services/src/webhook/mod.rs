//! SSRF guard shared by `NotifierGateway` before any outbound webhook POST.

pub mod ssrf;
