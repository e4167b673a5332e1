use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use tubeproxy::hls::rewrite_playlist;
use url::Url;

fn media_playlist(segments: usize) -> String {
    let mut playlist = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-MEDIA-SEQUENCE:0\n\
         #EXT-X-KEY:METHOD=AES-128,URI=\"https://keys.example/k1\"\n",
    );
    for i in 0..segments {
        playlist.push_str("#EXTINF:4.000,\n");
        if i % 2 == 0 {
            playlist.push_str(&format!("segment{i:05}.ts\n"));
        } else {
            playlist.push_str(&format!(
                "https://edge.example/live/segment{i:05}.ts?exp=1700000000&sig=abcdef\n"
            ));
        }
    }
    playlist.push_str("#EXT-X-ENDLIST\n");
    playlist
}

fn bench_rewrite(c: &mut Criterion) {
    let base = Url::parse("https://cdn.example/live/v1/index.m3u8").unwrap();
    let mut group = c.benchmark_group("rewrite_playlist");

    for segments in [10, 100, 1000] {
        let playlist = media_playlist(segments);
        group.throughput(Throughput::Bytes(playlist.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(segments), &playlist, |b, p| {
            b.iter(|| rewrite_playlist(black_box(p), black_box(&base)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_rewrite);
criterion_main!(benches);
