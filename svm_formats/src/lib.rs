pub mod fingerprint;
pub mod savefile;
pub mod savegame;
pub mod thumbnail;

pub use fingerprint::{DirectoryScan, FileFingerprint, hash_bytes, scan_directory};
pub use savefile::{
    AUTOSAVE_SLOT, DirectorySaveFiles, SaveFileManager, SaveStateDescriptor, list_saves,
    parse_slot, query_save_meta_infos, slot_file_name,
};
pub use savegame::{
    SaveDate, SaveError, SaveGame, SaveHeader, SaveInfo, SaveMetadata, decode_payload,
    encode_payload, read_save_metadata, read_savegame, write_savegame,
};
pub use thumbnail::{Thumbnail, rgb565};
