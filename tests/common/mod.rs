use faction_sim::Scenario;
use faction_sim::store::MemoryStore;

/// A small world with two rival factions, a member roster, a three-node
/// location graph, and a couple of residents. Shared by the round-trip
/// tests.
pub fn build_test_store() -> MemoryStore {
    let mut s = Scenario::at_year(100);
    let ravens = s
        .faction("Ravens")
        .influence(60.0)
        .gold(300.0)
        .internal_tension(45.0)
        .id();
    let larks = s.faction("Larks").influence(40.0).gold(120.0).id();
    s.make_at_war(ravens, larks);

    for (i, loyalty) in [15.0, 40.0, 85.0].iter().enumerate() {
        s.add_member(ravens, 500 + i as u64, *loyalty);
    }
    s.add_member(larks, 600, 70.0);

    let roost = s.add_poi("The Roost", 2);
    let fields = s.add_poi("Low Fields", 0);
    let pass = s.add_poi("High Pass", 4);
    s.connect(roost, fields);
    s.connect(fields, pass);
    s.give_outpost(ravens, roost, 6);
    s.add_npc_at("Mira", fields);
    s.add_npc_at("Tamsin", pass);

    s.build()
}
