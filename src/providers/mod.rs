pub mod etfchannel;

pub use etfchannel::EtfChannelProvider;
