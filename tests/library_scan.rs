use std::fs;
use std::path::Path;

use rusqlite::Connection;
use songbook_manager::db::{fetch_library_songs, init_schema, replace_library_songs};
use songbook_manager::library::{Column, Library};
use songbook_manager::NewSong;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, content).expect("write");
}

#[test]
fn scan_reads_metadata_and_survives_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let songs = dir.path().join("songs");
    write(
        &songs.join("brel/ne_me_quitte_pas.sg"),
        "\\selectlanguage{french}\n\\beginsong{Ne me quitte pas}\n  [by=Jacques Brel,cov=brel,album=La Valse \\`a mille temps]\n\\cover\n\\endsong\n",
    );
    write(&songs.join("brel/brel.jpg"), "jpeg");
    write(
        &songs.join("beatles/yesterday.sg"),
        "\\beginsong{Yesterday}[by=The Beatles]\n\\lilypond{x}\n\\endsong\n",
    );
    write(&songs.join("beatles/notes.txt"), "not a song");

    let mut library = Library::new(dir.path());
    let mut calls = Vec::new();
    let report = library
        .update(|done, total| calls.push((done, total)))
        .expect("scan");

    assert_eq!(report.parsed, 2);
    assert_eq!(calls.last(), Some(&(2, 2)));
    assert_eq!(report.to_string(), "Song database updated: 2 songs.");

    let yesterday = library
        .songs()
        .iter()
        .position(|song| song.title == "Yesterday")
        .expect("yesterday parsed");
    let brel = 1 - yesterday;
    assert!(library.songs()[yesterday].is_lilypond);
    assert_eq!(library.songs()[brel].album, "La Valse à mille temps");

    let album = library.cell(brel, Column::Album).expect("album cell");
    assert_eq!(album.decoration.as_deref(), Some("▣"));
    let language = library.cell(brel, Column::Language).expect("language cell");
    assert_eq!(language.decoration.as_deref(), Some("FR"));

    let mut conn = Connection::open_in_memory().expect("db");
    init_schema(&conn).expect("schema");
    replace_library_songs(&mut conn, dir.path(), library.songs()).expect("store");
    let stored = fetch_library_songs(&conn, dir.path()).expect("load");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].title, "Ne me quitte pas");
}

#[test]
fn created_song_is_picked_up_by_the_library() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cover = dir.path().join("front.jpg");
    fs::write(&cover, "jpeg").expect("cover");

    let song = NewSong {
        title: "Hey Jude".to_string(),
        artist: "The Beatles".to_string(),
        album: "Single".to_string(),
        cover: Some(cover),
        columns: 2,
        capo: 0,
    };
    let path = song.create_in(dir.path()).expect("create");
    assert!(song.create_in(dir.path()).is_err(), "second create must refuse");

    let mut library = Library::new(dir.path());
    library.update(|_, _| {}).expect("scan");
    let parsed = library.song(0).expect("one song");
    assert_eq!(parsed.path, path);
    assert_eq!(parsed.title, "Hey Jude");
    assert_eq!(parsed.artist, "The Beatles");
    assert_eq!(parsed.album, "Single");
    assert!(parsed.cover_file().is_file());
}
