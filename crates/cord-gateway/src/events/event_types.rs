//! Gateway event types
//!
//! Well-known names sent in the `t` field of dispatch frames, and the intents
//! that make the gateway deliver them. Listeners may subscribe to any name;
//! this table only covers the common ones.

use cord_core::Intents;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! event_types {
    ($($(#[$doc:meta])* $variant:ident => $name:literal, $intents:expr;)+) => {
        /// Well-known dispatch event
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum GatewayEventType {
            $($(#[$doc])* $variant,)+
        }

        impl GatewayEventType {
            /// Every known event, in table order
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire name (`t`)
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Intents that make the gateway send this event
            ///
            /// Empty for events every session receives. Events with more than one
            /// flag arrive when any of them is set.
            #[must_use]
            pub const fn intents(self) -> Intents {
                match self {
                    $(Self::$variant => $intents,)+
                }
            }
        }
    };
}

event_types! {
    /// Identify accepted, session established
    Ready => "READY", Intents::empty();
    /// Resume accepted, missed events replayed
    Resumed => "RESUMED", Intents::empty();

    /// Guild became available or was joined
    GuildCreate => "GUILD_CREATE", Intents::GUILDS;
    GuildUpdate => "GUILD_UPDATE", Intents::GUILDS;
    /// Guild left, unavailable, or deleted
    GuildDelete => "GUILD_DELETE", Intents::GUILDS;

    ChannelCreate => "CHANNEL_CREATE", Intents::GUILDS;
    ChannelUpdate => "CHANNEL_UPDATE", Intents::GUILDS;
    ChannelDelete => "CHANNEL_DELETE", Intents::GUILDS;
    /// Thread created, or the current user was added to one
    ThreadCreate => "THREAD_CREATE", Intents::GUILDS;

    MessageCreate => "MESSAGE_CREATE", Intents::GUILD_MESSAGES.union(Intents::DIRECT_MESSAGES);
    MessageUpdate => "MESSAGE_UPDATE", Intents::GUILD_MESSAGES.union(Intents::DIRECT_MESSAGES);
    MessageDelete => "MESSAGE_DELETE", Intents::GUILD_MESSAGES.union(Intents::DIRECT_MESSAGES);

    MessageReactionAdd => "MESSAGE_REACTION_ADD",
        Intents::GUILD_MESSAGE_REACTIONS.union(Intents::DIRECT_MESSAGE_REACTIONS);
    MessageReactionRemove => "MESSAGE_REACTION_REMOVE",
        Intents::GUILD_MESSAGE_REACTIONS.union(Intents::DIRECT_MESSAGE_REACTIONS);

    GuildMemberAdd => "GUILD_MEMBER_ADD", Intents::GUILD_MEMBERS;
    GuildMemberUpdate => "GUILD_MEMBER_UPDATE", Intents::GUILD_MEMBERS;
    GuildMemberRemove => "GUILD_MEMBER_REMOVE", Intents::GUILD_MEMBERS;

    PresenceUpdate => "PRESENCE_UPDATE", Intents::GUILD_PRESENCES;
    TypingStart => "TYPING_START",
        Intents::GUILD_MESSAGE_TYPING.union(Intents::DIRECT_MESSAGE_TYPING);

    /// The current user changed
    UserUpdate => "USER_UPDATE", Intents::empty();
    /// Slash command or component interaction
    InteractionCreate => "INTERACTION_CREATE", Intents::empty();
}

impl GatewayEventType {
    /// Look up a wire name; unknown names are `None`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|event| event.as_str() == s)
    }

    /// Check if a session identified with `intents` receives this event
    #[must_use]
    pub const fn is_delivered_with(self, intents: Intents) -> bool {
        let required = self.intents();
        required.is_empty() || intents.intersects(required)
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<GatewayEventType> for String {
    fn from(event: GatewayEventType) -> Self {
        event.as_str().to_string()
    }
}
