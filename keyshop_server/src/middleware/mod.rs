mod acl;
mod bearer;
mod hmac;

pub use acl::{AclMiddlewareFactory, AclMiddlewareService};
pub use bearer::{BearerAuthFactory, BearerAuthService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, SIGNATURE_HEADERS};
