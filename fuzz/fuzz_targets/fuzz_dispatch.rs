#![no_main]

use fallback_verifier::protocol::registry::ConnectionState;
use fallback_verifier::protocol::{Dispatcher, ProtocolVersion};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }
    // First byte picks the version, second the state
    let versions = ProtocolVersion::SUPPORTED;
    let version = versions[data[0] as usize % versions.len()];
    let state = match data[1] % 4 {
        0 => ConnectionState::Handshake,
        1 => ConnectionState::Login,
        2 => ConnectionState::Configuration,
        _ => ConnectionState::Game,
    };

    let mut dispatcher = Dispatcher::new();
    dispatcher.set_version(version);
    dispatcher.set_state(state);
    let _ = dispatcher.decode(&data[2..]);
});
