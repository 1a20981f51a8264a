mod note;

pub use note::{CreateNoteRequest, NewNote, Note, NoteColor, NoteCount, UpdateNoteRequest};
