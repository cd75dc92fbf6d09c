//! A scripted game client for driving the engine over an in-memory stream.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use bytes::{BufMut, Bytes, BytesMut};
use fallback_verifier::config::{MovementCheck, VehicleCheck};
use fallback_verifier::core::codec::FrameCodec;
use fallback_verifier::core::wire::{PacketReader, WireWrite};
use fallback_verifier::protocol::packets::{
    ArmSwing, BlockType, ClientInformation, Encode, Handshake, Intent, LoginStart, Movement, PaddleBoat,
    PlayerInput, PluginMessage, SetCarriedItem, Transaction, VehicleMove,
};
use fallback_verifier::protocol::registry::{self, ConnectionState, Direction, PacketKind};
use fallback_verifier::protocol::ProtocolVersion;
use fallback_verifier::VerifierConfig;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio_util::codec::Framed;

pub fn fast_config() -> VerifierConfig {
    VerifierConfig::default_with_overrides(|c| {
        c.queue.poll_interval = Duration::from_millis(50);
        c.logging.metrics_interval = Duration::ZERO;
    })
}

/// Where the server placed the player.
#[derive(Debug, Clone, Copy)]
pub struct Teleport {
    pub id: i32,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// What the client remembers about the fake world.
#[derive(Debug, Default)]
struct WorldView {
    player_id: i32,
    spawn: Option<Teleport>,
    landing: Option<f64>,
    slot: i16,
    vehicles: u32,
    /// Vehicle to ride once the server acknowledges it: boat flag and y
    mounting: Option<(bool, f64)>,
    riding: Option<f64>,
    /// Y of the vehicle just removed
    dismounted: Option<f64>,
}

pub struct TestClient {
    framed: Framed<DuplexStream, FrameCodec>,
    pub state: ConnectionState,
    pub version: ProtocolVersion,
    pub movement: MovementCheck,
    pub vehicle: VehicleCheck,
    world: WorldView,
}

impl TestClient {
    pub fn new(stream: DuplexStream, version: ProtocolVersion) -> Self {
        Self {
            framed: Framed::new(stream, FrameCodec::new()),
            state: ConnectionState::Handshake,
            version,
            movement: MovementCheck::default(),
            vehicle: VehicleCheck::default(),
            world: WorldView::default(),
        }
    }

    pub async fn send_raw(&mut self, kind: PacketKind, body: &[u8]) {
        let id = registry::id_for(self.state, Direction::Serverbound, kind, self.version)
            .unwrap_or_else(|| panic!("{kind:?} has no id in {}", self.state));
        let mut frame = BytesMut::new();
        frame.put_varint(id);
        frame.put_slice(body);
        self.framed.send(frame.freeze()).await.unwrap();
    }

    pub async fn send<P: Encode>(&mut self, kind: PacketKind, packet: &P) {
        let mut body = BytesMut::new();
        packet.encode(&mut body, self.version).unwrap();
        self.send_raw(kind, &body).await;
    }

    /// Next clientbound packet, or `None` once the server closed the stream.
    pub async fn recv(&mut self) -> Option<(PacketKind, Bytes)> {
        let frame = tokio::time::timeout(Duration::from_secs(10), self.framed.next())
            .await
            .expect("server went silent")?
            .ok()?;
        let mut reader = PacketReader::new(&frame);
        let id = reader.read_varint().unwrap();
        let kind = registry::kind_for(self.state, Direction::Clientbound, self.version, id)
            .unwrap_or_else(|| panic!("unknown clientbound id {id:#04x} in {}", self.state));
        Some((kind, Bytes::copy_from_slice(reader.read_remaining())))
    }

    /// Skip packets until one of `kind` arrives.
    pub async fn expect(&mut self, kind: PacketKind) -> Bytes {
        loop {
            match self.recv().await {
                Some((got, body)) if got == kind => return body,
                Some(_) => continue,
                None => panic!("stream closed while waiting for {kind:?}"),
            }
        }
    }

    pub async fn login(&mut self, username: &str, intent: Intent) {
        let handshake = Handshake {
            protocol_id: self.version.id(),
            hostname: "localhost".to_string(),
            port: 25565,
            intent,
        };
        self.send(PacketKind::Handshake, &handshake).await;
        if intent == Intent::Status {
            return;
        }
        self.state = ConnectionState::Login;
        let login = LoginStart {
            username: username.to_string(),
            uuid: Some(uuid::Uuid::new_v4()),
        };
        self.send(PacketKind::LoginStart, &login).await;
    }

    pub async fn send_client_data(&mut self) {
        let info = ClientInformation {
            locale: "en_us".to_string(),
            view_distance: 8,
            chat_visibility: 0,
            chat_colors: true,
            skin_parts: 0x7F,
            main_hand: 1,
            chat_filtering: false,
            client_listing: true,
            particle_status: 0,
        };
        self.send(PacketKind::ClientInformation, &info).await;

        let mut data = Vec::new();
        if self.version >= ProtocolVersion::V1_8 {
            data.push(7);
        }
        data.extend_from_slice(b"vanilla");
        let channel = if self.version >= ProtocolVersion::V1_13 { "minecraft:brand" } else { "MC|Brand" };
        let brand = PluginMessage {
            channel: channel.to_string(),
            data,
        };
        self.send(PacketKind::PluginMessage, &brand).await;
    }

    pub async fn echo_keep_alive(&mut self) {
        let body = self.expect(PacketKind::KeepAlive).await;
        self.send_raw(PacketKind::KeepAlive, &body).await;
    }

    fn parse_teleport(&self, body: &[u8]) -> Teleport {
        let mut reader = PacketReader::new(body);
        if self.version >= ProtocolVersion::V1_21_2 {
            let id = reader.read_varint().unwrap();
            let (x, y, z) = (reader.read_f64().unwrap(), reader.read_f64().unwrap(), reader.read_f64().unwrap());
            return Teleport { id, x, y, z };
        }
        let x = reader.read_f64().unwrap();
        let mut y = reader.read_f64().unwrap();
        if self.version < ProtocolVersion::V1_8 {
            // Eye height on the wire
            y -= 1.62;
        }
        let z = reader.read_f64().unwrap();
        let _rotation = (reader.read_f32().unwrap(), reader.read_f32().unwrap());
        let _flags = reader.read_u8().unwrap();
        let id = if self.version >= ProtocolVersion::V1_9 {
            reader.read_varint().unwrap()
        } else {
            0
        };
        Teleport { id, x, y, z }
    }

    pub async fn expect_teleport(&mut self) -> Teleport {
        let body = self.expect(PacketKind::PlayerPosition).await;
        self.parse_teleport(&body)
    }

    /// Position echo with rotation, 64 blocks up.
    pub async fn send_position(&mut self, x: f64, z: f64) {
        self.send_movement(x, 64.0, z, true, false).await;
    }

    async fn send_movement(&mut self, x: f64, y: f64, z: f64, rotated: bool, on_ground: bool) {
        let movement = Movement {
            position: Some((x, y, z)),
            rotation: rotated.then_some((0.0, 0.0)),
            on_ground,
        };
        let kind = if rotated { PacketKind::PositionRotation } else { PacketKind::Position };
        self.send(kind, &movement).await;
        if self.version >= ProtocolVersion::V1_21_2 {
            self.send_raw(PacketKind::ClientTickEnd, &[]).await;
        }
    }

    pub async fn confirm_teleport(&mut self, teleport_id: i32) {
        let mut body = BytesMut::new();
        body.put_varint(teleport_id);
        self.send_raw(PacketKind::ConfirmTeleport, &body).await;
    }

    /// Play through every check, reacting like a vanilla client, until the
    /// server disconnects or transfers. Returns the final packet kind.
    pub async fn play_honestly(&mut self, username: &str) -> Option<PacketKind> {
        self.login(username, Intent::Login).await;
        loop {
            let (kind, body) = self.recv().await?;
            match kind {
                PacketKind::LoginSuccess => self.on_login_success().await,
                PacketKind::FinishConfiguration => {
                    self.send_raw(PacketKind::FinishConfiguration, &[]).await;
                    self.state = ConnectionState::Game;
                }
                PacketKind::KeepAlive => self.on_keep_alive(&body).await,
                PacketKind::JoinGame => {
                    self.world.player_id = PacketReader::new(&body).read_i32().unwrap();
                    if !self.version.has_configuration_phase() {
                        self.send_client_data().await;
                    }
                }
                PacketKind::UpdateSectionBlocks => {
                    let (y, block) = self.parse_platform(&body);
                    self.world.landing = Some(f64::from(y) + block.height(self.version));
                }
                PacketKind::PlayerPosition => {
                    let teleport = self.parse_teleport(&body);
                    self.world.spawn = Some(teleport);
                    self.fall(teleport).await;
                }
                PacketKind::Transaction => self.on_transaction(&body).await,
                PacketKind::SetHeldItem => self.on_held_item(&body).await,
                PacketKind::EntityAnimation => {
                    let entity_id = PacketReader::new(&body).read_varint().unwrap();
                    if entity_id == self.world.player_id {
                        self.send(PacketKind::Animation, &ArmSwing::main_hand(entity_id)).await;
                    }
                }
                PacketKind::SpawnEntity => {
                    self.world.vehicles += 1;
                    let y = self.parse_spawn_y(&body);
                    self.world.mounting = Some((self.world.vehicles == 1, y));
                }
                PacketKind::RemoveEntities => self.world.dismounted = self.world.riding.take(),
                PacketKind::Disconnect | PacketKind::Transfer => return Some(kind),
                _ => {}
            }
        }
    }

    async fn on_login_success(&mut self) {
        if self.version.has_configuration_phase() {
            self.send_raw(PacketKind::LoginAcknowledged, &[]).await;
            self.state = ConnectionState::Configuration;
            self.send_client_data().await;
        } else {
            self.state = ConnectionState::Game;
        }
    }

    async fn on_keep_alive(&mut self, body: &[u8]) {
        self.send_raw(PacketKind::KeepAlive, body).await;
        if let Some(y) = self.world.dismounted.take() {
            let spawn = self.world.spawn.expect("spawned");
            self.send_movement(spawn.x, y - 1.0, spawn.z, false, false).await;
        } else if let Some((boat, y)) = self.world.mounting.take() {
            self.world.riding = Some(y);
            self.ride(boat, y).await;
        }
    }

    /// Echo the teleport, then fall onto the platform.
    async fn fall(&mut self, teleport: Teleport) {
        let Teleport { id, x, y, z } = teleport;
        let modern = self.version >= ProtocolVersion::V1_21_2;
        if modern {
            self.send_movement(x, y, z, true, false).await;
            self.confirm_teleport(id).await;
        } else {
            if self.version >= ProtocolVersion::V1_9 {
                self.confirm_teleport(id).await;
            }
            self.send_movement(x, y, z, true, false).await;
        }
        if !self.movement.gravity && !self.movement.collisions {
            return;
        }

        // The first tick does not move yet
        self.send_movement(x, y, z, true, false).await;
        let drag = f64::from(0.98f32);
        let (mut y, mut motion) = (y, 0.0f64);
        for tick in 1.. {
            motion = (motion - 0.08) * drag;
            if let Some(landing) = self.world.landing.filter(|_| self.movement.collisions) {
                if y + motion <= landing {
                    self.send_movement(x, landing, z, false, true).await;
                    return;
                }
            }
            y += motion;
            self.send_movement(x, y, z, false, false).await;
            if !self.movement.collisions && tick >= self.movement.max_movement_ticks {
                return;
            }
        }
    }

    async fn on_transaction(&mut self, body: &[u8]) {
        let mut reader = PacketReader::new(body);
        let reply = if self.version < ProtocolVersion::V1_17 {
            Transaction {
                window_id: reader.read_i8().unwrap(),
                id: i32::from(reader.read_i16().unwrap()),
                accepted: true,
            }
        } else {
            Transaction {
                window_id: 0,
                id: reader.read_i32().unwrap(),
                accepted: true,
            }
        };
        self.send(PacketKind::Transaction, &reply).await;
    }

    async fn on_held_item(&mut self, body: &[u8]) {
        let mut reader = PacketReader::new(body);
        let slot = if self.version >= ProtocolVersion::V1_21_2 {
            reader.read_varint().unwrap() as i16
        } else {
            i16::from(reader.read_i8().unwrap())
        };
        if !(0..9).contains(&slot) || slot == self.world.slot {
            return;
        }
        self.world.slot = slot;
        self.send(PacketKind::SetHeldItem, &SetCarriedItem { slot }).await;
    }

    /// Steer the vehicle a few ticks past the required packet count.
    async fn ride(&mut self, boat: bool, y: f64) {
        let spawn = self.world.spawn.expect("spawned");
        let v = self.version;
        let rotation = Movement {
            position: None,
            rotation: Some((0.0, 0.0)),
            on_ground: false,
        };
        let input = PlayerInput {
            sideways: 0.0,
            forward: 0.98,
            jump: false,
            sneak: false,
        };
        let (mut boat_y, mut motion) = (y, 0.0f64);
        for _ in 0..self.vehicle.minimum_packets + 3 {
            if boat && v >= ProtocolVersion::V1_9 {
                motion -= f64::from(0.04f32);
                boat_y += motion;
                let vehicle_move = VehicleMove {
                    x: spawn.x,
                    y: boat_y,
                    z: spawn.z,
                    yaw: 0.0,
                    pitch: 0.0,
                };
                self.send(PacketKind::PaddleBoat, &PaddleBoat { left: false, right: false }).await;
                self.send(PacketKind::Rotation, &rotation).await;
                if v < ProtocolVersion::V1_21_2 {
                    self.send(PacketKind::PlayerInput, &input).await;
                }
                self.send(PacketKind::VehicleMove, &vehicle_move).await;
            } else {
                self.send(PacketKind::Rotation, &rotation).await;
                if v < ProtocolVersion::V1_21_2 {
                    self.send(PacketKind::PlayerInput, &input).await;
                }
            }
            if v >= ProtocolVersion::V1_21_2 {
                self.send_raw(PacketKind::ClientTickEnd, &[]).await;
            }
        }
    }

    /// Height and block of the first platform record.
    fn parse_platform(&self, body: &[u8]) -> (i32, BlockType) {
        let v = self.version;
        let mut reader = PacketReader::new(body);
        let (y, state) = if v < ProtocolVersion::V1_16_2 {
            let _chunk = (reader.read_i32().unwrap(), reader.read_i32().unwrap());
            if v < ProtocolVersion::V1_8 {
                let _count = (reader.read_i16().unwrap(), reader.read_i32().unwrap());
            } else {
                reader.read_varint().unwrap();
            }
            let y = i32::from(reader.read_u16().unwrap() & 0xFF);
            let state = if v >= ProtocolVersion::V1_13 {
                reader.read_varint().unwrap()
            } else if v >= ProtocolVersion::V1_8 {
                reader.read_varint().unwrap() >> 4
            } else {
                i32::from(reader.read_i16().unwrap()) >> 4
            };
            (y, state)
        } else {
            let section = reader.read_i64().unwrap();
            // Signed 20-bit section y in the low bits
            let section_y = ((section << 44) >> 44) as i32;
            if v < ProtocolVersion::V1_20 {
                reader.read_bool().unwrap();
            }
            reader.read_varint().unwrap();
            let record = read_varlong(&mut reader);
            (section_y * 16 + (record & 15) as i32, (record >> 12) as i32)
        };
        let block = BlockType::ALL
            .into_iter()
            .find(|block| block.state_id(v) == state)
            .unwrap_or_else(|| panic!("unknown platform block {state}"));
        (y, block)
    }

    fn parse_spawn_y(&self, body: &[u8]) -> f64 {
        let v = self.version;
        let mut reader = PacketReader::new(body);
        reader.read_varint().unwrap();
        if v >= ProtocolVersion::V1_9 {
            reader.read_uuid().unwrap();
        }
        if v >= ProtocolVersion::V1_14 {
            reader.read_varint().unwrap();
        } else {
            reader.read_u8().unwrap();
        }
        if v >= ProtocolVersion::V1_9 {
            reader.read_f64().unwrap();
            reader.read_f64().unwrap()
        } else {
            reader.read_i32().unwrap();
            f64::from(reader.read_i32().unwrap()) / 32.0
        }
    }
}

fn read_varlong(reader: &mut PacketReader<'_>) -> i64 {
    let mut value = 0u64;
    for shift in (0..70).step_by(7) {
        let byte = reader.read_u8().unwrap();
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return value as i64;
        }
    }
    panic!("varlong too long")
}
