//! A small reference SDK used by the in-crate test harness and by the
//! storage/permissions plugin examples. Real deployments register their own
//! bundle through [`crate::registry::global`]; nothing in the server crate
//! depends on these specific types.

mod domain;
mod enterprise;
mod root_user;

pub use domain::Domain;
pub use enterprise::Enterprise;
pub use root_user::RootUser;

use crate::registry::SdkBundle;

/// Builds the bundle these three entities register into, under the name
/// `"reference"`.
pub fn reference_bundle() -> SdkBundle {
    let bundle = SdkBundle::new("reference");
    bundle.register("rootuser", || Box::new(RootUser::default()));
    bundle.register("enterprise", || Box::new(Enterprise::default()));
    bundle.register("domain", || Box::new(Domain::default()));
    bundle
}
