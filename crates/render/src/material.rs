use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A texture/uniform channel a material may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Albedo,
    Emissive,
    Glossiness,
    Normal,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Albedo,
        Channel::Emissive,
        Channel::Glossiness,
        Channel::Normal,
    ];

    /// Texture unit the channel is sampled from.
    pub fn unit(self) -> u32 {
        self as u32
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Set of channels. Materials differ only in which channels they carry, so the
/// same uniform write path serves every material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Channel>", into = "Vec<Channel>")]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: ChannelSet = ChannelSet(0);
    /// Albedo only.
    pub const BASIC: ChannelSet = ChannelSet(0b0001);
    /// Every channel.
    pub const PBR: ChannelSet = ChannelSet(0b1111);

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub fn with(self, channel: Channel) -> Self {
        Self(self.0 | channel.bit())
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<Vec<Channel>> for ChannelSet {
    fn from(channels: Vec<Channel>) -> Self {
        channels.into_iter().fold(Self::EMPTY, Self::with)
    }
}

impl From<ChannelSet> for Vec<Channel> {
    fn from(set: ChannelSet) -> Self {
        set.iter().collect()
    }
}

/// Resolved per-material uniform values; absent channels fall back to neutral values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialUniform {
    pub albedo: Vec3,
    pub emissive: f32,
    pub glossiness: f32,
    pub normal: f32,
}

impl Default for MaterialUniform {
    fn default() -> Self {
        Self {
            albedo: Vec3::ONE,
            emissive: 0.0,
            glossiness: 0.0,
            normal: 0.0,
        }
    }
}

/// A material table entry. Its position in the table is the cell code that
/// selects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialDescriptor {
    pub name: String,
    pub channels: ChannelSet,
    pub albedo: Vec3,
    pub emissive: f32,
    pub glossiness: f32,
    pub normal: f32,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self::basic("default", Vec3::ONE)
    }
}

impl MaterialDescriptor {
    pub fn basic(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            channels: ChannelSet::BASIC,
            albedo,
            emissive: 0.0,
            glossiness: 0.0,
            normal: 0.0,
        }
    }

    pub fn pbr(name: impl Into<String>, albedo: Vec3, emissive: f32, glossiness: f32, normal: f32) -> Self {
        Self {
            name: name.into(),
            channels: ChannelSet::PBR,
            albedo,
            emissive,
            glossiness,
            normal,
        }
    }

    /// Texture units to bind, one per carried channel, in channel order.
    pub fn texture_units(&self) -> impl Iterator<Item = (Channel, u32)> {
        self.channels.iter().map(|c| (c, c.unit()))
    }

    pub fn uniform_values(&self) -> MaterialUniform {
        let mut u = MaterialUniform::default();
        for channel in self.channels.iter() {
            match channel {
                Channel::Albedo => u.albedo = self.albedo,
                Channel::Emissive => u.emissive = self.emissive,
                Channel::Glossiness => u.glossiness = self.glossiness,
                Channel::Normal => u.normal = self.normal,
            }
        }
        u
    }
}
