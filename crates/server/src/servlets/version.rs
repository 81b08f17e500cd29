use common::types::BuildInfo;

use crate::envelope::Envelope;
use crate::servlet::MethodTable;

/// `/version`: build and API version, no authentication.
pub fn table(build: BuildInfo) -> MethodTable {
    MethodTable::new("version").op("Serve", move |_req| {
        let build = build.clone();
        async move { Envelope::success(build) }
    })
}
