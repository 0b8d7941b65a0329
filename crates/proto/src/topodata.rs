//! Topology metadata messages
//!
//! Hand-written prost structs with fixed field tags. The tags are part of
//! the on-disk format stored in the topology backend; adding a field means
//! picking a fresh tag, never reusing a retired one.

/// Time is a wall-clock timestamp stored inside topology records.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Time {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanoseconds: i32,
}

/// KeyRange is a half-open interval `[start, end)` over binary keyspace
/// positions. An empty `start` means unbounded below, an empty `end` means
/// unbounded above.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct KeyRange {
    #[prost(bytes = "vec", tag = "1")]
    pub start: Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub end: Vec<u8>,
}

/// TabletAlias globally identifies a tablet: the cell it lives in plus a
/// cell-unique id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Message)]
pub struct TabletAlias {
    #[prost(string, tag = "1")]
    pub cell: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub uid: u32,
}

impl TabletAlias {
    /// Canonical `cell-uid` form used as a map key and in logs.
    pub fn to_display_string(&self) -> String {
        format!("{}-{:010}", self.cell, self.uid)
    }
}

/// TabletType describes the role a tablet plays in its shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TabletType {
    Unknown = 0,
    /// The tablet currently accepting writes for its shard.
    Primary = 1,
    /// A replication follower eligible for promotion.
    Replica = 2,
    /// A follower serving batch/analytics reads only.
    Rdonly = 3,
    Spare = 4,
    Backup = 5,
    Restore = 6,
    Drained = 7,
}

impl std::fmt::Display for TabletType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TabletType::Unknown => "unknown",
            TabletType::Primary => "primary",
            TabletType::Replica => "replica",
            TabletType::Rdonly => "rdonly",
            TabletType::Spare => "spare",
            TabletType::Backup => "backup",
            TabletType::Restore => "restore",
            TabletType::Drained => "drained",
        };
        write!(f, "{}", s)
    }
}

/// Tablet represents one MySQL server instance.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Tablet {
    #[prost(message, optional, tag = "1")]
    pub alias: ::core::option::Option<TabletAlias>,
    #[prost(string, tag = "2")]
    pub hostname: ::prost::alloc::string::String,
    #[prost(string, tag = "5")]
    pub keyspace: ::prost::alloc::string::String,
    #[prost(string, tag = "6")]
    pub shard: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "7")]
    pub key_range: ::core::option::Option<KeyRange>,
    #[prost(enumeration = "TabletType", tag = "8")]
    pub r#type: i32,
    #[prost(string, tag = "12")]
    pub mysql_hostname: ::prost::alloc::string::String,
    #[prost(int32, tag = "13")]
    pub mysql_port: i32,
}

impl Tablet {
    pub fn tablet_type(&self) -> TabletType {
        TabletType::try_from(self.r#type).unwrap_or(TabletType::Unknown)
    }
}

/// TabletControl is a per-tablet-type routing override inside a shard
/// record. Used to steer traffic and mask tables during resharding
/// cutovers.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TabletControl {
    #[prost(enumeration = "TabletType", tag = "1")]
    pub tablet_type: i32,
    /// Cells this control applies to. Empty means every cell, including
    /// cells created later.
    #[prost(string, repeated, tag = "2")]
    pub cells: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    /// Tables masked on the matching tablets.
    #[prost(string, repeated, tag = "4")]
    pub denied_tables: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}

/// Shard is the topology record for one range-partition of a keyspace.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Shard {
    #[prost(message, optional, tag = "1")]
    pub primary_alias: ::core::option::Option<TabletAlias>,
    #[prost(message, optional, tag = "2")]
    pub key_range: ::core::option::Option<KeyRange>,
    #[prost(message, repeated, tag = "6")]
    pub tablet_controls: ::prost::alloc::vec::Vec<TabletControl>,
    /// Whether the primary of this shard is in the serving graph. Cleared
    /// at creation time when a sibling shard covers an overlapping range.
    #[prost(bool, tag = "7")]
    pub is_primary_serving: bool,
    #[prost(message, optional, tag = "8")]
    pub primary_term_start_time: ::core::option::Option<Time>,
}

/// Keyspace is the topology record for a logical database.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Keyspace {
    #[prost(string, tag = "8")]
    pub durability_policy: ::prost::alloc::string::String,
}

/// VSchema is the minimal per-keyspace routing schema record. A default
/// record is written when a keyspace is first used so routing lookups
/// never observe a missing node.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VSchema {
    #[prost(bool, tag = "1")]
    pub sharded: bool,
    #[prost(bool, tag = "4")]
    pub require_explicit_routing: bool,
}

/// ShardReplication is the per-cell record listing which tablets serve a
/// shard inside that cell.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ShardReplication {
    #[prost(message, repeated, tag = "1")]
    pub nodes: ::prost::alloc::vec::Vec<shard_replication::Node>,
}

pub mod shard_replication {
    /// Node references one tablet present in the cell.
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Node {
        #[prost(message, optional, tag = "1")]
        pub tablet_alias: ::core::option::Option<super::TabletAlias>,
    }
}

/// CellInfo is the global record describing one cell: where its local
/// topology server lives and the root path inside it.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CellInfo {
    #[prost(string, tag = "1")]
    pub server_address: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub root: ::prost::alloc::string::String,
}
